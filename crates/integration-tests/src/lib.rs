//! Integration test support for the theme cart layer.
//!
//! [`FakeStore`] is an in-memory storefront cart served through `wiremock`:
//! it keeps real cart state, answers the cart AJAX endpoints the way a
//! storefront does and records every request, so tests can assert both what
//! the page shows and what went over the wire.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p theme-cart-integration-tests
//! ```

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use theme_cart::config::{CartType, UpdateStrategy};
use theme_cart::{Document, Element, Theme, ThemeConfig};

/// Id of the product page's add-to-cart button.
pub const ADD_BUTTON: &str = "product-add";
/// Id of the product page's buy-now button.
pub const BUY_BUTTON: &str = "product-buy";
/// Id of the header cart icon.
pub const CART_TRIGGER: &str = "header-cart";
/// Ids of the item-count badges.
pub const BADGES: [&str; 2] = ["header-count", "mobile-count"];

/// Variants the fake store sells: id, product title, variant title, price.
const CATALOG: [(u64, &str, &str, i64); 3] = [
    (123, "Pineapple Tee", "Large", 2500),
    (456, "Sticker Pack", "Default Title", 500),
    (789, "Limited Hoodie", "Medium", 6000),
];

/// One recorded request.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub body: String,
}

#[derive(Debug, Clone)]
struct FakeLine {
    key: String,
    variant_id: u64,
    quantity: u32,
}

#[derive(Debug, Default)]
struct StoreState {
    lines: Vec<FakeLine>,
    sold_out: HashSet<u64>,
    failing: HashSet<String>,
    line_only_add: bool,
    tax_rate_percent: i64,
    cart_discount: Option<(String, i64)>,
    delay: Option<Duration>,
    delay_next: Vec<(String, Duration)>,
    requests: Vec<Recorded>,
}

/// In-memory storefront cart.
///
/// Cheap to clone; clones share state.
#[derive(Debug, Clone, Default)]
pub struct FakeStore {
    state: Arc<Mutex<StoreState>>,
}

impl FakeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a mock server answering every request from this store.
    pub async fn serve(&self) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(self.clone())
            .mount(&server)
            .await;
        server
    }

    /// Reject adds of `variant_id` with 422 "Sold out".
    pub fn sell_out(&self, variant_id: u64) {
        self.state().sold_out.insert(variant_id);
    }

    /// Answer `path` with a 500 and no description.
    pub fn fail(&self, path: &str) {
        self.state().failing.insert(path.to_string());
    }

    /// Answer adds with the added line only instead of the whole cart.
    pub fn answer_adds_with_line_only(&self) {
        self.state().line_only_add = true;
    }

    /// Charge tax as a percentage of the subtotal.
    pub fn set_tax_rate(&self, percent: i64) {
        self.state().tax_rate_percent = percent;
    }

    /// Apply a cart-level discount.
    pub fn set_cart_discount(&self, title: &str, amount: i64) {
        self.state().cart_discount = Some((title.to_string(), amount));
    }

    /// Delay every response.
    pub fn set_delay(&self, delay: Duration) {
        self.state().delay = Some(delay);
    }

    /// Delay only the next response for `path`. The cart changes on arrival,
    /// the response is held back.
    pub fn delay_next(&self, path: &str, delay: Duration) {
        self.state().delay_next.push((path.to_string(), delay));
    }

    /// Put a variant in the cart without going through a request.
    pub fn seed(&self, variant_id: u64, quantity: u32) -> String {
        let mut state = self.state();
        add_line(&mut state, variant_id, quantity)
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<Recorded> {
        self.state().requests.clone()
    }

    /// Requests received for `path`.
    #[must_use]
    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    /// Number of mutating requests (everything but `GET /cart.js`).
    #[must_use]
    pub fn mutation_count(&self) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.path != "/cart.js")
            .count()
    }

    /// The store's current cart as `/cart.js` would return it.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        snapshot(&self.state())
    }

    /// Quantity of a line, if present.
    #[must_use]
    pub fn quantity(&self, key: &str) -> Option<u32> {
        self.state()
            .lines
            .iter()
            .find(|l| l.key == key)
            .map(|l| l.quantity)
    }
}

impl Respond for FakeStore {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let path = request.url.path().to_string();
        let body = String::from_utf8_lossy(&request.body).into_owned();

        let mut state = self.state();
        state.requests.push(Recorded {
            method: request.method.to_string(),
            path: path.clone(),
            body: body.clone(),
        });
        let delay = match state.delay_next.iter().position(|(p, _)| *p == path) {
            Some(pos) => Some(state.delay_next.remove(pos).1),
            None => state.delay,
        };

        let response = if state.failing.contains(&path) {
            ResponseTemplate::new(500).set_body_string("Internal Server Error")
        } else {
            match path.as_str() {
                "/cart.js" => ResponseTemplate::new(200).set_body_json(snapshot(&state)),
                "/cart/add.js" => handle_add(&mut state, &body),
                "/cart/change.js" => handle_change(&mut state, &body),
                "/cart/update.js" => handle_update(&mut state, &body),
                _ => ResponseTemplate::new(404).set_body_json(json!({
                    "status": 404,
                    "message": "Not Found",
                    "description": "Not Found"
                })),
            }
        };

        match delay {
            Some(delay) => response.set_delay(delay),
            None => response,
        }
    }
}

fn handle_add(state: &mut StoreState, body: &str) -> ResponseTemplate {
    let Ok(request) = serde_json::from_str::<Value>(body) else {
        return bad_request("Invalid JSON");
    };
    let Some(items) = request.get("items").and_then(Value::as_array) else {
        return bad_request("Missing items");
    };

    let mut added = Vec::new();
    for item in items {
        let id = item.get("id").and_then(Value::as_u64).unwrap_or_default();
        let quantity = item
            .get("quantity")
            .and_then(Value::as_u64)
            .and_then(|q| u32::try_from(q).ok())
            .unwrap_or(1);

        if state.sold_out.contains(&id) {
            return ResponseTemplate::new(422).set_body_json(json!({
                "status": 422,
                "message": "Cart Error",
                "description": "Sold out"
            }));
        }
        if catalog_entry(id).is_none() {
            return ResponseTemplate::new(404).set_body_json(json!({
                "status": 404,
                "message": "Cart Error",
                "description": "Cannot find variant"
            }));
        }
        added.push(add_line(state, id, quantity));
    }

    if state.line_only_add {
        let items: Vec<Value> = state
            .lines
            .iter()
            .filter(|l| added.contains(&l.key))
            .map(line_json)
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({ "items": items }))
    } else {
        ResponseTemplate::new(200).set_body_json(snapshot(state))
    }
}

fn handle_change(state: &mut StoreState, body: &str) -> ResponseTemplate {
    let Ok(request) = serde_json::from_str::<Value>(body) else {
        return bad_request("Invalid JSON");
    };
    let key = request.get("id").and_then(Value::as_str).unwrap_or_default();
    let quantity = request
        .get("quantity")
        .and_then(Value::as_u64)
        .and_then(|q| u32::try_from(q).ok());

    let (Some(pos), Some(quantity)) = (state.lines.iter().position(|l| l.key == key), quantity)
    else {
        return bad_request("no valid id or line parameter");
    };

    if quantity == 0 {
        state.lines.remove(pos);
    } else if let Some(line) = state.lines.get_mut(pos) {
        line.quantity = quantity;
    }
    ResponseTemplate::new(200).set_body_json(snapshot(state))
}

fn handle_update(state: &mut StoreState, body: &str) -> ResponseTemplate {
    let updates: Vec<u32> = url::form_urlencoded::parse(body.as_bytes())
        .filter(|(name, _)| name == "updates[]")
        .map(|(_, value)| value.parse().unwrap_or(0))
        .collect();

    for (line, quantity) in state.lines.iter_mut().zip(&updates) {
        line.quantity = *quantity;
    }
    state.lines.retain(|l| l.quantity > 0);
    ResponseTemplate::new(200).set_body_json(snapshot(state))
}

fn bad_request(description: &str) -> ResponseTemplate {
    ResponseTemplate::new(400).set_body_json(json!({
        "status": 400,
        "message": "Bad Request",
        "description": description
    }))
}

fn catalog_entry(variant_id: u64) -> Option<(u64, &'static str, &'static str, i64)> {
    CATALOG.iter().copied().find(|(id, ..)| *id == variant_id)
}

/// Add to an existing line of the same variant, or append a new one.
fn add_line(state: &mut StoreState, variant_id: u64, quantity: u32) -> String {
    if let Some(line) = state.lines.iter_mut().find(|l| l.variant_id == variant_id) {
        line.quantity += quantity;
        return line.key.clone();
    }
    let key = format!("{variant_id}:{:04x}", state.lines.len() + 1);
    state.lines.push(FakeLine {
        key: key.clone(),
        variant_id,
        quantity,
    });
    key
}

fn line_json(line: &FakeLine) -> Value {
    let (_, product_title, variant_title, price) =
        catalog_entry(line.variant_id).unwrap_or((line.variant_id, "Unknown", "Default Title", 0));
    json!({
        "key": line.key,
        "id": line.variant_id,
        "quantity": line.quantity,
        "title": format!("{product_title} - {variant_title}"),
        "product_title": product_title,
        "variant_title": variant_title,
        "price": price,
        "final_price": price,
        "final_line_price": price * i64::from(line.quantity),
        "url": format!("/products/{}?variant={}", product_title.to_lowercase().replace(' ', "-"), line.variant_id),
        "image": format!("//cdn.example.com/{}.jpg", line.variant_id),
        "discount_allocated_amount": 0
    })
}

fn snapshot(state: &StoreState) -> Value {
    let items: Vec<Value> = state.lines.iter().map(line_json).collect();
    let item_count: u32 = state.lines.iter().map(|l| l.quantity).sum();
    let subtotal: i64 = items
        .iter()
        .filter_map(|i| i.get("final_line_price").and_then(Value::as_i64))
        .sum();

    let discounts: Vec<Value> = state
        .cart_discount
        .iter()
        .filter(|_| subtotal > 0)
        .map(|(title, amount)| json!({ "title": title, "total_allocated_amount": amount }))
        .collect();
    let discount: i64 = state
        .cart_discount
        .as_ref()
        .filter(|_| subtotal > 0)
        .map_or(0, |(_, amount)| *amount);

    let tax = subtotal * state.tax_rate_percent / 100;

    json!({
        "token": "fake-cart-token",
        "note": null,
        "item_count": item_count,
        "items": items,
        "items_subtotal_price": subtotal,
        "total_price": subtotal - discount + tax,
        "total_discount": discount,
        "cart_level_discount_applications": discounts,
        "currency": "USD"
    })
}

/// Configuration pointed at a mock server.
#[must_use]
pub fn config_for(server: &MockServer, cart_type: CartType, strategy: UpdateStrategy) -> ThemeConfig {
    let url = Url::parse(&server.uri()).unwrap_or_else(|e| panic!("mock server uri: {e}"));
    ThemeConfig {
        cart_type,
        update_strategy: strategy,
        request_timeout: Duration::from_secs(5),
        added_feedback: Duration::from_millis(50),
        ..ThemeConfig::new(url)
    }
}

/// A product page: add and buy buttons for `variant_id`, a cart icon and
/// two item-count badges.
#[must_use]
pub fn product_page(variant_id: &str) -> Document {
    let doc = Document::new();
    doc.insert(BADGES[0], Element::new("0").with_flag("data-cart-count"));
    doc.insert(
        CART_TRIGGER,
        Element::new("Cart").with_flag("data-cart-drawer-trigger"),
    );
    doc.insert(
        ADD_BUTTON,
        Element::new("Add to cart")
            .with_flag("data-add-to-cart")
            .with_attr("data-variant-id", variant_id),
    );
    doc.insert(
        BUY_BUTTON,
        Element::new("Buy it now")
            .with_flag("data-buy-now")
            .with_attr("data-variant-id", variant_id),
    );
    doc.insert(BADGES[1], Element::new("0").with_flag("data-cart-count"));
    doc
}

/// A theme on a product page for `variant_id`, talking to `server`.
#[must_use]
pub fn theme_for(
    server: &MockServer,
    variant_id: &str,
    cart_type: CartType,
    strategy: UpdateStrategy,
) -> Theme {
    Theme::new(
        config_for(server, cart_type, strategy),
        product_page(variant_id),
    )
    .unwrap_or_else(|e| panic!("theme setup: {e}"))
}
