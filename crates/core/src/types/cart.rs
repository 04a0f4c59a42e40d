//! Cart snapshot types.
//!
//! A [`Cart`] is always a server snapshot: it is fetched fresh after every
//! mutation and never computed locally. Amounts are minor currency units.

use serde::{Deserialize, Serialize};

use super::id::LineKey;

/// Variant title the platform uses for products without options.
pub const DEFAULT_VARIANT_TITLE: &str = "Default Title";

/// A cart snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cart {
    /// Total quantity across all lines.
    pub item_count: u32,
    /// Sum of line totals before cart-level adjustments and taxes.
    pub subtotal: i64,
    /// Amount to pay.
    pub total: i64,
    /// Taxes, derived as `total - subtotal` and floored at zero.
    pub tax_amount: i64,
    /// Lines in server order.
    pub lines: Vec<LineItem>,
    /// Cart-level discount applications.
    pub discounts: Vec<Discount>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the drawer should show its empty view.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.item_count == 0
    }

    /// Look up a line by key.
    #[must_use]
    pub fn line(&self, key: &LineKey) -> Option<&LineItem> {
        self.lines.iter().find(|line| &line.key == key)
    }

    /// Sum of positive per-line discount allocations.
    #[must_use]
    pub fn item_discount_total(&self) -> i64 {
        self.lines
            .iter()
            .map(|line| line.discount_allocated)
            .filter(|amount| *amount > 0)
            .sum()
    }
}

/// One cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Server-assigned key, used for every mutation of this line.
    pub key: LineKey,
    /// Product title.
    pub title: String,
    /// Variant title, `None` for [`DEFAULT_VARIANT_TITLE`].
    pub variant_label: Option<String>,
    /// Image URL, already normalized to an absolute or root-relative path.
    pub image_url: Option<String>,
    /// Product URL.
    pub url: String,
    /// Quantity; zero never appears in a server snapshot.
    pub quantity: u32,
    /// Price per unit after discounts.
    pub unit_price: i64,
    /// Line total; may be less than `quantity * unit_price` when discounted.
    pub line_total: i64,
    /// Discount allocated to this line.
    pub discount_allocated: i64,
}

/// A cart-level discount application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    /// Display label.
    pub label: String,
    /// Amount allocated across the cart.
    pub amount: i64,
}

/// Returns the variant label to display, hiding the platform default.
#[must_use]
pub fn variant_label(title: Option<&str>) -> Option<String> {
    match title {
        Some(t) if !t.is_empty() && t != DEFAULT_VARIANT_TITLE => Some(t.to_string()),
        _ => None,
    }
}

/// Normalize an image reference for rendering.
///
/// Absolute (`http…`) and protocol-relative (`//…`) URLs are kept, anything
/// else is rooted with a leading `/`.
#[must_use]
pub fn normalize_image_url(url: Option<&str>) -> Option<String> {
    let url = url.map(str::trim).filter(|u| !u.is_empty())?;
    if url.starts_with("http") || url.starts_with("//") || url.starts_with('/') {
        Some(url.to_string())
    } else {
        Some(format!("/{url}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(key: &str, quantity: u32, discount: i64) -> LineItem {
        LineItem {
            key: LineKey::new(key),
            title: "Pineapple Tee".to_string(),
            variant_label: None,
            image_url: None,
            url: "/products/pineapple-tee".to_string(),
            quantity,
            unit_price: 2500,
            line_total: 2500 * i64::from(quantity) - discount,
            discount_allocated: discount,
        }
    }

    #[test]
    fn test_empty_cart() {
        let cart = Cart::empty();
        assert!(cart.is_empty());
        assert!(cart.lines.is_empty());
        assert_eq!(cart.item_discount_total(), 0);
    }

    #[test]
    fn test_line_lookup() {
        let cart = Cart {
            item_count: 3,
            lines: vec![line("a:1", 1, 0), line("b:2", 2, 0)],
            ..Cart::default()
        };
        assert_eq!(cart.line(&LineKey::new("b:2")).map(|l| l.quantity), Some(2));
        assert!(cart.line(&LineKey::new("c:3")).is_none());
    }

    #[test]
    fn test_item_discount_total_ignores_non_positive() {
        let cart = Cart {
            item_count: 3,
            lines: vec![line("a", 1, 300), line("b", 1, 0), line("c", 1, -50)],
            ..Cart::default()
        };
        assert_eq!(cart.item_discount_total(), 300);
    }

    #[test]
    fn test_variant_label_hides_default_title() {
        assert_eq!(variant_label(Some("Default Title")), None);
        assert_eq!(variant_label(Some("")), None);
        assert_eq!(variant_label(None), None);
        assert_eq!(variant_label(Some("Large / Blue")), Some("Large / Blue".to_string()));
    }

    #[test]
    fn test_normalize_image_url() {
        assert_eq!(
            normalize_image_url(Some("https://cdn.shopify.com/a.jpg")).as_deref(),
            Some("https://cdn.shopify.com/a.jpg")
        );
        assert_eq!(
            normalize_image_url(Some("//cdn.shopify.com/a.jpg")).as_deref(),
            Some("//cdn.shopify.com/a.jpg")
        );
        assert_eq!(
            normalize_image_url(Some("files/a.jpg")).as_deref(),
            Some("/files/a.jpg")
        );
        assert_eq!(normalize_image_url(Some("  ")), None);
        assert_eq!(normalize_image_url(None), None);
    }
}
