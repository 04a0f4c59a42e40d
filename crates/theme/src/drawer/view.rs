//! Drawer view models, template and control registry.
//!
//! Amounts are preformatted so the template only places strings.

use askama::Template;

use theme_cart_core::{Cart, LineItem, LineKey, MoneyFormat};

use crate::config::{DrawerLabels, RoutesConfig};
use crate::dom::{ATTR_DRAWER_CONTENT, Element};

pub const CHECKOUT_ID: &str = "cart-drawer-checkout";
pub const CONTINUE_ID: &str = "cart-drawer-continue";
pub const PROMO_ID: &str = "cart-drawer-promo-code";

/// Element id prefix for a line's controls.
#[must_use]
pub fn line_dom_id(key: &LineKey) -> String {
    format!("cart-line-{key}")
}

#[must_use]
pub fn row_id(key: &LineKey) -> String {
    format!("{}-row", line_dom_id(key))
}

#[must_use]
pub fn quantity_id(key: &LineKey) -> String {
    format!("{}-quantity", line_dom_id(key))
}

#[must_use]
pub fn increase_id(key: &LineKey) -> String {
    format!("{}-increase", line_dom_id(key))
}

#[must_use]
pub fn decrease_id(key: &LineKey) -> String {
    format!("{}-decrease", line_dom_id(key))
}

#[must_use]
pub fn remove_id(key: &LineKey) -> String {
    format!("{}-remove", line_dom_id(key))
}

/// Line display data for templates.
#[derive(Debug, Clone)]
pub struct LineView {
    pub key: String,
    pub dom_id: String,
    pub title: String,
    pub variant_label: Option<String>,
    pub image_url: Option<String>,
    pub url: String,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
    pub disabled: bool,
}

/// Cart-level discount display data.
#[derive(Debug, Clone)]
pub struct DiscountView {
    pub label: String,
    pub amount: String,
}

/// Drawer display data for templates.
#[derive(Debug, Clone)]
pub struct DrawerView {
    pub is_empty: bool,
    pub item_count: u32,
    pub lines: Vec<LineView>,
    pub subtotal: String,
    pub taxes: String,
    pub item_discounts: Option<String>,
    pub discounts: Vec<DiscountView>,
    pub total: String,
    pub labels: DrawerLabels,
    pub cart_url: String,
    pub continue_url: String,
}

impl DrawerView {
    /// Build the view for a snapshot.
    ///
    /// `busy` reports whether a line has a request in flight; its controls
    /// render disabled.
    #[must_use]
    pub fn new(
        cart: &Cart,
        money: &MoneyFormat,
        labels: &DrawerLabels,
        routes: &RoutesConfig,
        busy: impl Fn(&LineKey) -> bool,
    ) -> Self {
        let item_discounts = cart.item_discount_total();

        Self {
            is_empty: cart.is_empty(),
            item_count: cart.item_count,
            lines: cart
                .lines
                .iter()
                .map(|line| LineView::new(line, money, busy(&line.key)))
                .collect(),
            subtotal: money.format(cart.subtotal),
            taxes: money.format(cart.tax_amount),
            item_discounts: (item_discounts > 0).then(|| money.format(item_discounts)),
            discounts: cart
                .discounts
                .iter()
                .map(|d| DiscountView {
                    label: d.label.clone(),
                    amount: money.format(d.amount),
                })
                .collect(),
            total: money.format(cart.total),
            labels: labels.clone(),
            cart_url: routes.cart.clone(),
            continue_url: routes.continue_shopping.clone(),
        }
    }

    /// Elements the rendered content exposes to event delegation.
    #[must_use]
    pub fn controls(&self) -> Vec<(String, Element)> {
        let content = |label: &str| {
            Element::new(label)
                .with_flag(ATTR_DRAWER_CONTENT)
                .inside_drawer()
        };

        let mut controls = Vec::with_capacity(self.lines.len() * 5 + 3);

        for line in &self.lines {
            let key = LineKey::new(line.key.as_str());
            let quantity = line.quantity.to_string();
            let lock = |mut el: Element| {
                el.disabled = line.disabled;
                el
            };

            controls.push((
                row_id(&key),
                content(line.title.as_str())
                    .with_attr("data-line-item", line.key.as_str())
                    .with_attr("data-key", line.key.as_str()),
            ));
            controls.push((
                decrease_id(&key),
                lock(
                    content("-")
                        .with_flag("data-decrease-quantity")
                        .with_attr("data-key", line.key.as_str()),
                ),
            ));
            controls.push((
                quantity_id(&key),
                lock(
                    content("")
                        .with_flag("data-quantity-input")
                        .with_attr("name", "updates[]")
                        .with_attr("data-key", line.key.as_str())
                        .with_attr("data-original-value", quantity.as_str())
                        .with_value(quantity.as_str()),
                ),
            ));
            controls.push((
                increase_id(&key),
                lock(
                    content("+")
                        .with_flag("data-increase-quantity")
                        .with_attr("data-key", line.key.as_str()),
                ),
            ));
            controls.push((
                remove_id(&key),
                lock(
                    content("Remove")
                        .with_flag("data-remove-item")
                        .with_attr("data-key", line.key.as_str()),
                ),
            ));
        }

        if !self.is_empty {
            // Display only: the code is not submitted with the cart.
            controls.push((
                PROMO_ID.to_string(),
                content("")
                    .with_flag("data-promo-code")
                    .with_attr("placeholder", self.labels.promo_placeholder.as_str())
                    .with_value(""),
            ));
            controls.push((
                CHECKOUT_ID.to_string(),
                content(self.labels.checkout.as_str()).with_flag("data-cart-checkout"),
            ));
        }
        controls.push((
            CONTINUE_ID.to_string(),
            content(self.labels.continue_shopping.as_str())
                .with_flag("data-continue-shopping")
                .with_attr("href", self.continue_url.as_str()),
        ));

        controls
    }
}

impl LineView {
    fn new(line: &LineItem, money: &MoneyFormat, disabled: bool) -> Self {
        Self {
            key: line.key.to_string(),
            dom_id: line_dom_id(&line.key),
            title: line.title.clone(),
            variant_label: line.variant_label.clone(),
            image_url: line.image_url.clone(),
            url: line.url.clone(),
            quantity: line.quantity,
            price: money.format(line.unit_price),
            line_price: money.format(line.line_total),
            disabled,
        }
    }
}

/// Drawer content template.
#[derive(Template)]
#[template(path = "drawer/content.html")]
pub struct DrawerContentTemplate {
    pub drawer: DrawerView,
}
