//! Client for the storefront cart AJAX endpoints.
//!
//! # Architecture
//!
//! - The server is the source of truth: no local cart state is kept, every
//!   call returns a fresh [`Cart`](theme_cart_core::Cart) snapshot
//! - One request per user action, no retries
//! - Responses that do not look like a full cart are reconciled with
//!   `GET /cart.js` before being returned
//!
//! # Endpoints
//!
//! | Operation                            | Request                    |
//! |--------------------------------------|----------------------------|
//! | [`CartClient::add_item`]             | `POST /cart/add.js`        |
//! | [`CartClient::set_quantity`]         | `POST /cart/change.js`     |
//! | [`CartClient::update_quantities`]    | `POST /cart/update.js`     |
//! | [`CartClient::fetch_cart`]           | `GET /cart.js`             |

mod client;
pub mod types;

pub use client::{CartClient, bulk_updates};
pub use types::*;

use thiserror::Error;

/// Shown when a failure carries no server description.
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

/// Errors that can occur when calling the cart endpoints.
#[derive(Debug, Error)]
pub enum CartError {
    /// Network failure, timeout or client construction failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response.
    #[error("Cart request rejected ({status}): {description}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Server-provided description, or a generic message.
        description: String,
    },

    /// Response body was not valid JSON for the expected type.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Endpoint URL could not be built from the store URL.
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The line to update is not part of the displayed cart.
    #[error("Unknown cart line: {0}")]
    UnknownLine(String),
}

impl CartError {
    /// Text suitable for showing to the shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { description, .. } => description.clone(),
            _ => GENERIC_FAILURE.to_string(),
        }
    }

    /// Whether this failure is worth reporting as a fault rather than a
    /// shopper-facing rejection like "Sold out".
    #[must_use]
    pub const fn is_fault(&self) -> bool {
        match self {
            Self::Rejected { status, .. } => *status >= 500,
            _ => true,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_server_description() {
        let err = CartError::Rejected {
            status: 422,
            description: "Sold out".to_string(),
        };
        assert_eq!(err.user_message(), "Sold out");
        assert!(!err.is_fault());
    }

    #[test]
    fn test_user_message_generic_for_transport_errors() {
        let err = CartError::UnknownLine("abc".to_string());
        assert_eq!(err.user_message(), GENERIC_FAILURE);

        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = CartError::from(parse);
        assert_eq!(err.user_message(), GENERIC_FAILURE);
        assert!(err.is_fault());
    }

    #[test]
    fn test_server_errors_are_faults() {
        let err = CartError::Rejected {
            status: 503,
            description: "Failed to update cart".to_string(),
        };
        assert!(err.is_fault());
    }
}
