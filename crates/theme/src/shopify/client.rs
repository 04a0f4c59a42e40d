//! `CartClient` - one request per call, snapshot in, snapshot out.

use std::sync::Arc;

use reqwest::RequestBuilder;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use theme_cart_core::{Cart, LineKey, VariantId};

use super::CartError;
use super::types::{AddItem, AddRequest, CartSnapshot, ChangeRequest, ErrorResponse, is_cart_snapshot};
use crate::config::ThemeConfig;

const ADD_FAILED: &str = "Failed to add item to cart";
const UPDATE_FAILED: &str = "Failed to update cart";
const FETCH_FAILED: &str = "Failed to fetch cart";

/// Client for the cart AJAX endpoints.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct CartClient {
    inner: Arc<CartClientInner>,
}

struct CartClientInner {
    client: reqwest::Client,
    add_url: Url,
    change_url: Url,
    update_url: Url,
    cart_url: Url,
}

impl CartClient {
    /// Create a client for the configured store.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the endpoint
    /// URLs cannot be derived from the store URL.
    pub fn new(config: &ThemeConfig) -> Result<Self, CartError> {
        // The cart is keyed by the store's session cookie.
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .cookie_store(true)
            .build()?;

        let base = &config.store_url;
        Ok(Self {
            inner: Arc::new(CartClientInner {
                client,
                add_url: base.join("/cart/add.js")?,
                change_url: base.join("/cart/change.js")?,
                update_url: base.join("/cart/update.js")?,
                cart_url: base.join("/cart.js")?,
            }),
        })
    }

    /// Add `quantity` of a variant to the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Rejected` with the server's description (e.g.
    /// "Sold out") on a non-2xx response, or a transport/parse error.
    #[instrument(skip(self))]
    pub async fn add_item(&self, variant_id: VariantId, quantity: u32) -> Result<Cart, CartError> {
        let body = AddRequest {
            items: vec![AddItem {
                id: variant_id,
                quantity,
            }],
        };
        let request = self.inner.client.post(self.inner.add_url.clone()).json(&body);
        let value = self.send(request, ADD_FAILED).await?;
        self.reconcile(value).await
    }

    /// Set one line's quantity through `/cart/change.js`. Zero removes it.
    ///
    /// Other lines are left untouched by the endpoint.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Rejected` on a non-2xx response, or a
    /// transport/parse error.
    #[instrument(skip(self))]
    pub async fn set_quantity(&self, key: &LineKey, quantity: u32) -> Result<Cart, CartError> {
        let body = ChangeRequest { id: key, quantity };
        let request = self
            .inner
            .client
            .post(self.inner.change_url.clone())
            .json(&body);
        let value = self.send(request, UPDATE_FAILED).await?;
        self.reconcile(value).await
    }

    /// Replace every line's quantity through `/cart/update.js`.
    ///
    /// `quantities` is the full `updates[]` list in line order; see
    /// [`bulk_updates`] for building it from the displayed cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Rejected` on a non-2xx response, or a
    /// transport/parse error.
    #[instrument(skip(self, quantities), fields(lines = quantities.len()))]
    pub async fn update_quantities(&self, quantities: &[u32]) -> Result<Cart, CartError> {
        let form: Vec<(&str, String)> = quantities
            .iter()
            .map(|quantity| ("updates[]", quantity.to_string()))
            .collect();
        let request = self
            .inner
            .client
            .post(self.inner.update_url.clone())
            .form(&form);
        let value = self.send(request, UPDATE_FAILED).await?;
        self.reconcile(value).await
    }

    /// Fetch the current cart snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error on a non-2xx response or when the body is not a cart.
    #[instrument(skip(self))]
    pub async fn fetch_cart(&self) -> Result<Cart, CartError> {
        let request = self.inner.client.get(self.inner.cart_url.clone());
        let value = self.send(request, FETCH_FAILED).await?;
        let snapshot: CartSnapshot = serde_json::from_value(value)?;
        Ok(Cart::from(snapshot))
    }

    /// Use the response as the snapshot when it is one, else re-fetch.
    async fn reconcile(&self, value: Value) -> Result<Cart, CartError> {
        if is_cart_snapshot(&value) {
            let snapshot: CartSnapshot = serde_json::from_value(value)?;
            return Ok(Cart::from(snapshot));
        }
        debug!("Response is not a full cart snapshot, fetching /cart.js");
        self.fetch_cart().await
    }

    /// Send a request and return the JSON body of a 2xx response.
    async fn send(&self, request: RequestBuilder, fallback: &str) -> Result<Value, CartError> {
        let response = match request.header("Accept", "application/json").send().await {
            Ok(response) => response,
            Err(e) => return Err(reported(CartError::Http(e))),
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return Err(reported(CartError::Http(e))),
        };

        if !status.is_success() {
            let description = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.description)
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| fallback.to_string());

            tracing::warn!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Cart endpoint returned non-success status"
            );

            return Err(reported(CartError::Rejected {
                status: status.as_u16(),
                description,
            }));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse cart endpoint response"
            );
            reported(CartError::Parse(e))
        })
    }
}

/// Build the `updates[]` list for `/cart/update.js`.
///
/// Every line keeps its displayed quantity except `key`, which gets
/// `quantity`. Returns `None` when `key` is not displayed.
#[must_use]
pub fn bulk_updates(displayed: &[(LineKey, u32)], key: &LineKey, quantity: u32) -> Option<Vec<u32>> {
    if !displayed.iter().any(|(k, _)| k == key) {
        return None;
    }
    Some(
        displayed
            .iter()
            .map(|(k, current)| if k == key { quantity } else { *current })
            .collect(),
    )
}

/// Capture faults to Sentry; shopper-facing rejections stay in the logs.
fn reported(err: CartError) -> CartError {
    if err.is_fault() {
        let event_id = sentry::capture_error(&err);
        tracing::error!(error = %err, sentry_event_id = %event_id, "Cart request failed");
    }
    err
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn displayed() -> Vec<(LineKey, u32)> {
        vec![
            (LineKey::new("a:1"), 2),
            (LineKey::new("b:2"), 1),
            (LineKey::new("c:3"), 5),
        ]
    }

    #[test]
    fn test_bulk_updates_echoes_other_lines() {
        let updates = bulk_updates(&displayed(), &LineKey::new("b:2"), 4).unwrap();
        assert_eq!(updates, vec![2, 4, 5]);
    }

    #[test]
    fn test_bulk_updates_zero_removes_only_target() {
        let updates = bulk_updates(&displayed(), &LineKey::new("a:1"), 0).unwrap();
        assert_eq!(updates, vec![0, 1, 5]);
    }

    #[test]
    fn test_bulk_updates_unknown_line() {
        assert!(bulk_updates(&displayed(), &LineKey::new("zzz"), 1).is_none());
    }

    #[test]
    fn test_endpoints_resolve_against_store_url() {
        let config = ThemeConfig::new(Url::parse("https://shop.example.com/en/").unwrap());
        let client = CartClient::new(&config).unwrap();
        assert_eq!(client.inner.add_url.as_str(), "https://shop.example.com/cart/add.js");
        assert_eq!(client.inner.cart_url.as_str(), "https://shop.example.com/cart.js");
        assert_eq!(
            client.inner.update_url.as_str(),
            "https://shop.example.com/cart/update.js"
        );
    }
}
