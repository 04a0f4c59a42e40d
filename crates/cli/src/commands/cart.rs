//! Cart commands.
//!
//! Each command builds a one-page session: a product control, a header
//! badge and the drawer, then drives them with the same events a shopper's
//! clicks would fire.

use std::sync::Arc;

use thiserror::Error;

use theme_cart::drawer::view::{decrease_id, increase_id, quantity_id, remove_id};
use theme_cart::{Document, Element, Outcome, Theme, ThemeConfig, ThemeError, UiEvent};
use theme_cart_core::{Cart, LineKey, MoneyFormat};

const ADD_BUTTON_ID: &str = "product-add-to-cart";
const BADGE_ID: &str = "header-cart-count";

/// Errors that can occur while running a cart command.
#[derive(Debug, Error)]
pub enum CartCommandError {
    /// Theme setup or a cart request failed.
    #[error(transparent)]
    Theme(#[from] ThemeError),

    /// The store refused the action.
    #[error("{0}")]
    Failed(String),

    /// The action was rejected before any request.
    #[error("Invalid input: {0}")]
    Invalid(String),
}

/// Direction for `inc` / `dec`.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Increase,
    Decrease,
}

/// A page with the cart layer attached.
pub struct Session {
    theme: Theme,
}

impl Session {
    /// Attach the cart layer to a fresh page.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart client cannot be built.
    pub fn new(config: ThemeConfig) -> Result<Self, CartCommandError> {
        let document = Document::new();
        document.insert(BADGE_ID, Element::new("0").with_flag("data-cart-count"));
        Ok(Self {
            theme: Theme::new(config, document)?,
        })
    }

    /// Fetch and print the cart.
    pub async fn show(&self, html: bool) -> Result<(), CartCommandError> {
        let cart = self.theme.drawer().refresh().await?;
        self.print(&cart, html);
        Ok(())
    }

    /// Add a variant through the product page's add-to-cart control.
    pub async fn add(&self, variant: &str, quantity: u32, buy: bool) -> Result<(), CartCommandError> {
        let button = Element::new("Add to cart")
            .with_flag(if buy { "data-buy-now" } else { "data-add-to-cart" })
            .with_attr("data-variant-id", variant)
            .with_attr("data-quantity", quantity.to_string());
        self.theme.document().insert(ADD_BUTTON_ID, button);

        let outcome = self.theme.dispatch(UiEvent::click(ADD_BUTTON_ID)).await;
        self.check(outcome, || format!("variant id {variant:?}"))?;

        if let Some(location) = self.theme.document().location() {
            tracing::info!(location = %location, "Navigated");
        }
        self.print(&self.latest(), false);
        Ok(())
    }

    /// Commit a typed quantity for a line.
    pub async fn set(&self, key: &str, quantity: &str) -> Result<(), CartCommandError> {
        let key = self.open_line(key).await?;
        let outcome = self
            .theme
            .dispatch(UiEvent::change(quantity_id(&key), quantity))
            .await;
        self.finish(outcome)
    }

    /// Step a line's quantity by one.
    pub async fn step(&self, key: &str, step: Step) -> Result<(), CartCommandError> {
        let key = self.open_line(key).await?;
        let target = match step {
            Step::Increase => increase_id(&key),
            Step::Decrease => decrease_id(&key),
        };
        let outcome = self.theme.dispatch(UiEvent::click(target)).await;
        self.finish(outcome)
    }

    /// Remove a line.
    pub async fn remove(&self, key: &str) -> Result<(), CartCommandError> {
        let key = self.open_line(key).await?;
        let outcome = self.theme.dispatch(UiEvent::click(remove_id(&key))).await;
        self.finish(outcome)
    }

    /// Open the drawer and make sure it shows `key`.
    async fn open_line(&self, key: &str) -> Result<LineKey, CartCommandError> {
        let outcome = self.theme.drawer().open().await;
        self.check(outcome, String::new)?;

        let key = LineKey::new(key);
        if self.theme.document().element(&quantity_id(&key)).is_none() {
            return Err(ThemeError::MissingElement(format!("cart line {key}")).into());
        }
        Ok(key)
    }

    fn finish(&self, outcome: Outcome) -> Result<(), CartCommandError> {
        self.check(outcome, String::new)?;
        self.print(&self.latest(), false);
        Ok(())
    }

    /// The last snapshot the page applied. Every successful action publishes
    /// one, so nothing is re-fetched.
    fn latest(&self) -> Cart {
        self.theme
            .context()
            .latest()
            .map_or_else(|| self.theme.drawer().current(), Arc::unwrap_or_clone)
    }

    fn check(&self, outcome: Outcome, invalid: impl FnOnce() -> String) -> Result<(), CartCommandError> {
        match &outcome {
            Outcome::Failed(message) => Err(CartCommandError::Failed(message.clone())),
            Outcome::Invalid => Err(CartCommandError::Invalid(invalid())),
            Outcome::Busy | Outcome::Ignored | Outcome::Applied => {
                tracing::debug!(?outcome, badges = ?self.theme.document().badge_texts(), "Action done");
                Ok(())
            }
        }
    }

    #[allow(clippy::print_stdout)]
    fn print(&self, cart: &Cart, html: bool) {
        if html {
            println!("{}", self.theme.document().drawer_html());
            return;
        }

        let money: &MoneyFormat = &self.theme.context().config().money_format;
        if cart.is_empty() {
            println!("{}", self.theme.context().config().labels.empty_title);
            return;
        }

        println!("{} ITEMS SELECTED", cart.item_count);
        for line in &cart.lines {
            let variant = line
                .variant_label
                .as_deref()
                .map(|v| format!(" ({v})"))
                .unwrap_or_default();
            println!(
                "  {} x {}{}  {}  [{}]",
                line.quantity,
                line.title,
                variant,
                money.format(line.line_total),
                line.key
            );
        }
        println!("SUBTOTAL  {}", money.format(cart.subtotal));
        println!("TAXES     {}", money.format(cart.tax_amount));
        for discount in &cart.discounts {
            println!("Discount ({})  -{}", discount.label, money.format(discount.amount));
        }
        println!("TOTAL     {}", money.format(cart.total));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use theme_cart::config::{CartType, parse_store_url};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn cart_json() -> serde_json::Value {
        json!({
            "item_count": 2,
            "total_price": 5000,
            "items": [{
                "key": "123:0001",
                "quantity": 2,
                "final_price": 2500,
                "final_line_price": 5000,
                "product_title": "Pineapple Tee"
            }]
        })
    }

    async fn session(server: &MockServer, cart_type: CartType) -> Session {
        let config = ThemeConfig {
            cart_type,
            ..ThemeConfig::new(parse_store_url(&server.uri()).unwrap())
        };
        Session::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_add_prints_applied_snapshot_without_refetching() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cart/add.js"))
            .respond_with(ResponseTemplate::new(200).set_body_json(cart_json()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cart.js"))
            .respond_with(ResponseTemplate::new(200).set_body_json(cart_json()))
            .expect(0)
            .mount(&server)
            .await;

        let session = session(&server, CartType::Page).await;
        session.add("123", 2, false).await.unwrap();

        assert_eq!(session.latest().item_count, 2);
        assert_eq!(session.theme.document().badge_texts(), vec!["2"]);
    }

    #[tokio::test]
    async fn test_add_with_drawer_fetches_once_on_open() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cart/add.js"))
            .respond_with(ResponseTemplate::new(200).set_body_json(cart_json()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cart.js"))
            .respond_with(ResponseTemplate::new(200).set_body_json(cart_json()))
            .expect(1)
            .mount(&server)
            .await;

        let session = session(&server, CartType::Drawer).await;
        session.add("123", 2, false).await.unwrap();

        assert_eq!(session.latest().lines[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_add_rejects_invalid_variant() {
        let server = MockServer::start().await;
        let session = session(&server, CartType::Page).await;

        let err = session.add("abc", 1, false).await.unwrap_err();
        assert!(matches!(err, CartCommandError::Invalid(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
