//! Identifiers used by the cart endpoints.
//!
//! - [`VariantId`] - numeric product variant id, read from `data-variant-id`.
//! - [`LineKey`] - opaque cart line key assigned by the server.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`VariantId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VariantIdError {
    /// The attribute is absent or blank.
    #[error("variant id is missing")]
    Missing,
    /// The attribute is not a positive integer.
    #[error("variant id must be a positive integer (got {0:?})")]
    Invalid(String),
}

/// A product variant id.
///
/// Always strictly positive.
///
/// ```
/// use theme_cart_core::VariantId;
///
/// assert_eq!(VariantId::parse("123").unwrap().as_u64(), 123);
/// assert!(VariantId::parse("0").is_err());
/// assert!(VariantId::parse("abc").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantId(u64);

impl VariantId {
    /// Create a variant id, rejecting zero.
    #[must_use]
    pub const fn new(id: u64) -> Option<Self> {
        if id == 0 { None } else { Some(Self(id)) }
    }

    /// Parse a variant id from an attribute value.
    ///
    /// # Errors
    ///
    /// Returns [`VariantIdError::Missing`] for an empty value and
    /// [`VariantIdError::Invalid`] for anything that is not a positive integer.
    pub fn parse(s: &str) -> Result<Self, VariantIdError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(VariantIdError::Missing);
        }
        trimmed
            .parse::<u64>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| VariantIdError::Invalid(s.to_string()))
    }

    /// Parse an optional attribute value.
    ///
    /// # Errors
    ///
    /// See [`VariantId::parse`]; `None` is [`VariantIdError::Missing`].
    pub fn from_attr(value: Option<&str>) -> Result<Self, VariantIdError> {
        value.map_or(Err(VariantIdError::Missing), Self::parse)
    }

    /// Get the underlying value.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for VariantId {
    type Err = VariantIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A cart line key.
///
/// Unique within one cart and stable for a variant + properties combination.
/// Treated as opaque: never parsed, only echoed back to the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineKey(String);

impl LineKey {
    /// Wrap a key string.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LineKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LineKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}
