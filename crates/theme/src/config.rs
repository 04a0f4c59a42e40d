//! Theme configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `THEME_STORE_URL` - Base URL of the storefront serving the cart endpoints
//!
//! ## Optional
//! - `THEME_CART_TYPE` - `drawer` or `page` (default: drawer)
//! - `THEME_MONEY_FORMAT` - Money pattern (default: `${{amount}}`)
//! - `THEME_CART_UPDATE` - `change` or `update` (default: change)
//! - `THEME_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 15)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use theme_cart_core::{DEFAULT_MONEY_FORMAT, MoneyFormat};

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
const DEFAULT_ADDED_FEEDBACK_MS: u64 = 1000;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// How the cart is presented after an add.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CartType {
    /// Open the cart drawer.
    #[default]
    Drawer,
    /// Navigate to the cart page.
    Page,
}

impl FromStr for CartType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drawer" => Ok(Self::Drawer),
            "page" => Ok(Self::Page),
            other => Err(format!("expected 'drawer' or 'page', got '{other}'")),
        }
    }
}

/// Which endpoint carries quantity changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateStrategy {
    /// `POST /cart/change.js` with one `{ id, quantity }`.
    #[default]
    Change,
    /// `POST /cart/update.js` with the full `updates[]` list in line order.
    Update,
}

impl FromStr for UpdateStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "change" => Ok(Self::Change),
            "update" => Ok(Self::Update),
            other => Err(format!("expected 'change' or 'update', got '{other}'")),
        }
    }
}

/// Page routes the glue navigates to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutesConfig {
    pub cart: String,
    pub checkout: String,
    pub continue_shopping: String,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            cart: "/cart".to_string(),
            checkout: "/checkout".to_string(),
            continue_shopping: "/collections/all".to_string(),
        }
    }
}

/// Text shown by the drawer and the add/buy controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawerLabels {
    pub empty_title: String,
    pub empty_text: String,
    pub continue_shopping: String,
    pub checkout: String,
    pub adding: String,
    pub added: String,
    pub promo_label: String,
    pub promo_placeholder: String,
    pub update_failed: String,
    pub remove_failed: String,
}

impl Default for DrawerLabels {
    fn default() -> Self {
        Self {
            empty_title: "Your cart is empty".to_string(),
            empty_text: "Continue shopping to add items to your cart.".to_string(),
            continue_shopping: "continue shopping".to_string(),
            checkout: "Buy Now".to_string(),
            adding: "Adding...".to_string(),
            added: "Added!".to_string(),
            promo_label: "PROMO CODE".to_string(),
            promo_placeholder: "ENTER HERE".to_string(),
            update_failed: "Failed to update cart. Please try again.".to_string(),
            remove_failed: "Failed to remove item. Please try again.".to_string(),
        }
    }
}

/// Theme configuration.
///
/// One instance per page; the cart type is page-wide, never per button.
#[derive(Debug, Clone)]
pub struct ThemeConfig {
    /// Storefront origin the cart endpoints are resolved against
    pub store_url: Url,
    /// Drawer or page cart
    pub cart_type: CartType,
    /// Money pattern for every rendered amount
    pub money_format: MoneyFormat,
    /// Quantity change endpoint
    pub update_strategy: UpdateStrategy,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// How long an add button shows its "added" label before resetting
    pub added_feedback: Duration,
    /// Navigation targets
    pub routes: RoutesConfig,
    /// Drawer and button text
    pub labels: DrawerLabels,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl ThemeConfig {
    /// Configuration with defaults for everything but the store URL.
    #[must_use]
    pub fn new(store_url: Url) -> Self {
        Self {
            store_url,
            cart_type: CartType::default(),
            money_format: MoneyFormat::default(),
            update_strategy: UpdateStrategy::default(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            added_feedback: Duration::from_millis(DEFAULT_ADDED_FEEDBACK_MS),
            routes: RoutesConfig::default(),
            labels: DrawerLabels::default(),
            sentry_dsn: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let store_url = parse_store_url(&get_required_env("THEME_STORE_URL")?)?;
        let cart_type = get_parsed_env("THEME_CART_TYPE", "drawer")?;
        let update_strategy = get_parsed_env("THEME_CART_UPDATE", "change")?;
        let timeout_secs = get_env_or_default(
            "THEME_REQUEST_TIMEOUT_SECS",
            &DEFAULT_REQUEST_TIMEOUT_SECS.to_string(),
        )
        .parse::<u64>()
        .map_err(|e| {
            ConfigError::InvalidEnvVar("THEME_REQUEST_TIMEOUT_SECS".to_string(), e.to_string())
        })?;
        let money_format =
            MoneyFormat::parse(&get_env_or_default("THEME_MONEY_FORMAT", DEFAULT_MONEY_FORMAT));

        Ok(Self {
            cart_type,
            update_strategy,
            money_format,
            request_timeout: Duration::from_secs(timeout_secs),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            ..Self::new(store_url)
        })
    }
}

/// Parse and validate the storefront base URL.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for unparseable or non-HTTP URLs.
pub fn parse_store_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar("THEME_STORE_URL".to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "THEME_STORE_URL".to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get an environment variable parsed through `FromStr`.
fn get_parsed_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr<Err = String>,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_type_parse() {
        assert_eq!("drawer".parse::<CartType>().unwrap(), CartType::Drawer);
        assert_eq!(" Page ".parse::<CartType>().unwrap(), CartType::Page);
        assert!("modal".parse::<CartType>().is_err());
    }

    #[test]
    fn test_update_strategy_parse() {
        assert_eq!(
            "change".parse::<UpdateStrategy>().unwrap(),
            UpdateStrategy::Change
        );
        assert_eq!(
            "UPDATE".parse::<UpdateStrategy>().unwrap(),
            UpdateStrategy::Update
        );
        assert!("bulk".parse::<UpdateStrategy>().is_err());
    }

    #[test]
    fn test_parse_store_url() {
        let url = parse_store_url("https://shop.example.com").unwrap();
        assert_eq!(url.host_str(), Some("shop.example.com"));

        assert!(matches!(
            parse_store_url("not a url"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(matches!(
            parse_store_url("ftp://shop.example.com"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
    }

    #[test]
    fn test_new_uses_defaults() {
        let config = ThemeConfig::new(Url::parse("http://127.0.0.1:9000").unwrap());
        assert_eq!(config.cart_type, CartType::Drawer);
        assert_eq!(config.update_strategy, UpdateStrategy::Change);
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert_eq!(config.added_feedback, Duration::from_secs(1));
        assert_eq!(config.labels.added, "Added!");
        assert_eq!(config.labels.promo_label, "PROMO CODE");
        assert_eq!(config.routes.checkout, "/checkout");
        assert_eq!(config.money_format.format(1999), "$19.99");
        assert!(config.sentry_dsn.is_none());
    }
}
