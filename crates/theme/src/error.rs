//! Unified error handling with Sentry integration.
//!
//! Cart failures are resolved where the user acted; `ThemeError` is what the
//! setup code and the CLI propagate.

use thiserror::Error;

use crate::config::ConfigError;
use crate::shopify::CartError;

/// Application-level error type for the theme layer.
#[derive(Debug, Error)]
pub enum ThemeError {
    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Cart endpoint call failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Drawer template failed to render.
    #[error("Render error: {0}")]
    Render(#[from] askama::Error),

    /// Element the caller expected on the page is missing.
    #[error("Element not found: {0}")]
    MissingElement(String),
}

/// Result type alias for `ThemeError`.
pub type Result<T> = std::result::Result<T, ThemeError>;

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of cart
/// actions leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Add to cart", Some(&[("variant_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
