//! Wire types for the cart AJAX JSON and their conversion into core types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use theme_cart_core::{
    Cart, Discount, LineItem, LineKey, VariantId, normalize_image_url, variant_label,
};

// =============================================================================
// Request Bodies
// =============================================================================

/// Body of `POST /cart/add.js`.
#[derive(Debug, Clone, Serialize)]
pub struct AddRequest {
    pub items: Vec<AddItem>,
}

/// One entry of [`AddRequest::items`].
#[derive(Debug, Clone, Serialize)]
pub struct AddItem {
    pub id: VariantId,
    pub quantity: u32,
}

/// Body of `POST /cart/change.js`.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeRequest<'a> {
    pub id: &'a LineKey,
    pub quantity: u32,
}

/// Error body returned with non-2xx responses.
///
/// Only `description` is shown to shoppers; `status` and `message` repeat
/// the HTTP status and are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub description: Option<String>,
}

// =============================================================================
// Cart Snapshot
// =============================================================================

/// `GET /cart.js` response (fields consumed by the drawer).
#[derive(Debug, Clone, Deserialize)]
pub struct CartSnapshot {
    pub item_count: u32,
    #[serde(default)]
    pub total_price: i64,
    #[serde(default)]
    pub items_subtotal_price: Option<i64>,
    #[serde(default)]
    pub items: Vec<CartSnapshotItem>,
    #[serde(default)]
    pub cart_level_discount_applications: Vec<DiscountApplication>,
}

/// One entry of [`CartSnapshot::items`].
#[derive(Debug, Clone, Deserialize)]
pub struct CartSnapshotItem {
    pub key: String,
    pub quantity: u32,
    #[serde(default)]
    pub final_price: i64,
    #[serde(default)]
    pub final_line_price: i64,
    #[serde(default)]
    pub product_title: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub variant_title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub discount_allocated_amount: i64,
}

/// One entry of [`CartSnapshot::cart_level_discount_applications`].
#[derive(Debug, Clone, Deserialize)]
pub struct DiscountApplication {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub total_allocated_amount: i64,
}

/// Whether a JSON response is a complete cart snapshot.
///
/// `/cart/add.js` may answer with the added line(s) only; those responses
/// must be reconciled with a fresh `GET /cart.js`.
#[must_use]
pub fn is_cart_snapshot(value: &Value) -> bool {
    value.get("item_count").is_some_and(Value::is_u64)
        && value.get("items").is_some_and(Value::is_array)
}

// =============================================================================
// Conversions
// =============================================================================

impl From<CartSnapshot> for Cart {
    fn from(snapshot: CartSnapshot) -> Self {
        let subtotal = snapshot
            .items_subtotal_price
            .unwrap_or(snapshot.total_price);

        Self {
            item_count: snapshot.item_count,
            subtotal,
            total: snapshot.total_price,
            tax_amount: (snapshot.total_price - subtotal).max(0),
            lines: snapshot.items.into_iter().map(LineItem::from).collect(),
            discounts: snapshot
                .cart_level_discount_applications
                .into_iter()
                .filter(|d| d.total_allocated_amount != 0)
                .map(|d| Discount {
                    label: d
                        .title
                        .filter(|t| !t.is_empty())
                        .unwrap_or_else(|| "Discount".to_string()),
                    amount: d.total_allocated_amount,
                })
                .collect(),
        }
    }
}

impl From<CartSnapshotItem> for LineItem {
    fn from(item: CartSnapshotItem) -> Self {
        let title = item
            .product_title
            .or(item.title)
            .unwrap_or_else(|| "Product".to_string());

        Self {
            key: LineKey::new(item.key),
            variant_label: variant_label(item.variant_title.as_deref()),
            image_url: normalize_image_url(item.image.as_deref()),
            url: item.url.unwrap_or_else(|| "#".to_string()),
            title,
            quantity: item.quantity,
            unit_price: item.final_price,
            line_total: item.final_line_price,
            discount_allocated: item.discount_allocated_amount,
        }
    }
}
