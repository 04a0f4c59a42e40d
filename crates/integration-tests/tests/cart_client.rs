//! Integration tests for `CartClient` against a fake storefront.

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use theme_cart::config::{CartType, UpdateStrategy};
use theme_cart::shopify::{CartClient, CartError};
use theme_cart_core::{LineKey, VariantId};
use theme_cart_integration_tests::{FakeStore, config_for};

fn client(server: &MockServer) -> CartClient {
    CartClient::new(&config_for(server, CartType::Drawer, UpdateStrategy::Change))
        .expect("failed to build test CartClient")
}

fn variant(id: u64) -> VariantId {
    VariantId::new(id).expect("non-zero variant id")
}

#[tokio::test]
async fn add_item_returns_server_snapshot() {
    let store = FakeStore::new();
    let server = store.serve().await;

    let cart = client(&server).add_item(variant(123), 2).await.unwrap();

    assert_eq!(cart.item_count, 2);
    assert_eq!(cart.lines.len(), 1);
    assert_eq!(cart.lines[0].title, "Pineapple Tee");
    assert_eq!(cart.lines[0].variant_label.as_deref(), Some("Large"));
    assert_eq!(cart.lines[0].line_total, 5000);

    let adds = store.requests_to("/cart/add.js");
    assert_eq!(adds.len(), 1);
    let body: serde_json::Value = serde_json::from_str(&adds[0].body).unwrap();
    assert_eq!(body, json!({ "items": [{ "id": 123, "quantity": 2 }] }));
}

#[tokio::test]
async fn add_item_hides_default_variant_title() {
    let store = FakeStore::new();
    let server = store.serve().await;

    let cart = client(&server).add_item(variant(456), 1).await.unwrap();
    assert_eq!(cart.lines[0].variant_label, None);
}

#[tokio::test]
async fn add_item_sold_out_surfaces_description() {
    let store = FakeStore::new();
    store.sell_out(123);
    let server = store.serve().await;

    let err = client(&server).add_item(variant(123), 1).await.unwrap_err();

    match &err {
        CartError::Rejected {
            status,
            description,
        } => {
            assert_eq!(*status, 422);
            assert_eq!(description, "Sold out");
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
    assert_eq!(err.user_message(), "Sold out");
    assert!(store.snapshot()["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn add_item_without_description_uses_fallback() {
    let store = FakeStore::new();
    store.fail("/cart/add.js");
    let server = store.serve().await;

    let err = client(&server).add_item(variant(123), 1).await.unwrap_err();
    assert!(matches!(
        err,
        CartError::Rejected { status: 500, ref description } if description == "Failed to add item to cart"
    ));
}

#[tokio::test]
async fn line_only_add_response_is_reconciled_with_cart_fetch() {
    let store = FakeStore::new();
    store.seed(456, 3);
    store.answer_adds_with_line_only();
    let server = store.serve().await;

    let cart = client(&server).add_item(variant(123), 1).await.unwrap();

    assert_eq!(cart.item_count, 4);
    assert_eq!(cart.lines.len(), 2);
    let paths: Vec<String> = store.requests().into_iter().map(|r| r.path).collect();
    assert_eq!(paths, vec!["/cart/add.js", "/cart.js"]);
}

#[tokio::test]
async fn set_quantity_posts_line_key_to_change_endpoint() {
    let store = FakeStore::new();
    let key = store.seed(123, 1);
    store.seed(456, 2);
    let server = store.serve().await;

    let cart = client(&server)
        .set_quantity(&LineKey::new(key.as_str()), 3)
        .await
        .unwrap();

    assert_eq!(cart.item_count, 5);
    assert_eq!(store.quantity(&key), Some(3));
    let body: serde_json::Value =
        serde_json::from_str(&store.requests_to("/cart/change.js")[0].body).unwrap();
    assert_eq!(body, json!({ "id": key, "quantity": 3 }));
}

#[tokio::test]
async fn set_quantity_zero_removes_only_that_line() {
    let store = FakeStore::new();
    let key = store.seed(123, 1);
    store.seed(456, 2);
    let server = store.serve().await;

    let cart = client(&server)
        .set_quantity(&LineKey::new(key.as_str()), 0)
        .await
        .unwrap();

    assert_eq!(cart.item_count, 2);
    assert_eq!(cart.lines.len(), 1);
    assert_eq!(store.quantity(&key), None);
}

#[tokio::test]
async fn update_quantities_sends_every_line_in_order() {
    let store = FakeStore::new();
    store.seed(123, 1);
    store.seed(456, 2);
    let server = store.serve().await;

    let cart = client(&server).update_quantities(&[1, 5]).await.unwrap();
    assert_eq!(cart.item_count, 6);

    let body = &store.requests_to("/cart/update.js")[0].body;
    let updates: Vec<(String, String)> = url::form_urlencoded::parse(body.as_bytes())
        .into_owned()
        .collect();
    assert_eq!(
        updates,
        vec![
            ("updates[]".to_string(), "1".to_string()),
            ("updates[]".to_string(), "5".to_string()),
        ]
    );
}

#[tokio::test]
async fn fetch_cart_derives_taxes_and_discounts() {
    let store = FakeStore::new();
    store.seed(123, 2);
    store.set_tax_rate(10);
    let server = store.serve().await;

    let cart = client(&server).fetch_cart().await.unwrap();
    assert_eq!(cart.subtotal, 5000);
    assert_eq!(cart.total, 5500);
    assert_eq!(cart.tax_amount, 500);

    store.set_tax_rate(0);
    store.set_cart_discount("WELCOME10", 500);
    let cart = client(&server).fetch_cart().await.unwrap();
    assert_eq!(cart.tax_amount, 0);
    assert_eq!(cart.discounts.len(), 1);
    assert_eq!(cart.discounts[0].label, "WELCOME10");
}

#[tokio::test]
async fn requests_ask_for_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cart.js"))
        .and(header("Accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "item_count": 0,
            "items": [],
            "total_price": 0
        })))
        .expect(1)
        .mount(&server)
        .await;

    let cart = client(&server).fetch_cart().await.unwrap();
    assert!(cart.is_empty());
}

#[tokio::test]
async fn non_cart_body_is_a_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cart.js"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = client(&server).fetch_cart().await.unwrap_err();
    assert!(matches!(err, CartError::Parse(_)));
    assert_eq!(err.user_message(), theme_cart::shopify::GENERIC_FAILURE);
}
