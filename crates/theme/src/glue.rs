//! Product page glue: add-to-cart, buy-now and cart trigger controls.
//!
//! Controls are found by attribute, not by id:
//!
//! - `data-add-to-cart` / `data-buy-now` with `data-variant-id` and an
//!   optional `data-quantity`
//! - `data-cart-drawer-trigger` opens the cart

use tracing::{info, instrument, warn};

use theme_cart_core::VariantId;

use crate::config::CartType;
use crate::dom::Element;
use crate::drawer::CartDrawer;
use crate::error::add_breadcrumb;
use crate::events::{Outcome, UiEvent};
use crate::state::ThemeContext;

/// Handlers for cart controls outside the drawer.
#[derive(Clone)]
pub struct PageGlue {
    ctx: ThemeContext,
    drawer: CartDrawer,
}

impl PageGlue {
    #[must_use]
    pub const fn new(ctx: ThemeContext, drawer: CartDrawer) -> Self {
        Self { ctx, drawer }
    }

    /// Handle an event on a page control.
    pub async fn handle(&self, event: &UiEvent) -> Outcome {
        let UiEvent::Click { target } = event else {
            return Outcome::Ignored;
        };
        let Some(element) = self.ctx.document().element(target) else {
            return Outcome::Ignored;
        };

        if element.has_attr("data-add-to-cart") || element.has_attr("data-buy-now") {
            self.add_to_cart(target, &element).await
        } else if element.has_attr("data-cart-drawer-trigger") {
            self.show_cart().await
        } else {
            Outcome::Ignored
        }
    }

    /// Open the drawer, or go to the cart page when the theme has no drawer.
    pub async fn show_cart(&self) -> Outcome {
        match self.ctx.config().cart_type {
            CartType::Drawer => self.drawer.open().await,
            CartType::Page => {
                self.ctx
                    .document()
                    .navigate(self.ctx.config().routes.cart.clone());
                Outcome::Applied
            }
        }
    }

    #[instrument(skip(self, element))]
    async fn add_to_cart(&self, target: &str, element: &Element) -> Outcome {
        if element.disabled {
            return Outcome::Busy;
        }

        let variant_id = match VariantId::from_attr(element.attr("data-variant-id")) {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "Add to cart control has no usable variant id");
                return Outcome::Invalid;
            }
        };
        let quantity = element
            .attr("data-quantity")
            .and_then(|q| q.trim().parse::<u32>().ok())
            .filter(|q| *q > 0)
            .unwrap_or(1);
        let buy_now = element.has_attr("data-buy-now");

        add_breadcrumb(
            "cart",
            if buy_now { "Buy now" } else { "Add to cart" },
            Some(&[
                ("variant_id", variant_id.to_string().as_str()),
                ("quantity", quantity.to_string().as_str()),
            ]),
        );

        let doc = self.ctx.document();
        let labels = &self.ctx.config().labels;
        let original_label = element.label.clone();
        doc.update(target, |el| {
            el.disabled = true;
            el.error = None;
            el.label.clone_from(&labels.adding);
        });

        let stamp = self.ctx.next_stamp();
        match self.ctx.client().add_item(variant_id, quantity).await {
            Ok(cart) => {
                info!(item_count = cart.item_count, "Added to cart");
                doc.update(target, |el| el.label.clone_from(&labels.added));
                self.reset_after_feedback(target, original_label);

                // Badges update now; an open drawer follows the published snapshot.
                self.ctx.apply(stamp, &cart, |_| {});

                if buy_now {
                    doc.navigate(self.ctx.config().routes.checkout.clone());
                    return Outcome::Applied;
                }

                // The drawer re-fetches as it opens.
                match self.show_cart().await {
                    Outcome::Failed(message) => Outcome::Failed(message),
                    _ => Outcome::Applied,
                }
            }
            Err(e) => {
                let message = e.user_message();
                doc.update(target, |el| {
                    el.disabled = false;
                    el.label = original_label;
                    el.error = Some(message.clone());
                });
                Outcome::Failed(message)
            }
        }
    }

    /// Keep the "added" label up for a moment, then restore the control.
    ///
    /// The control stays disabled until then. A label changed in the
    /// meantime is left alone.
    fn reset_after_feedback(&self, target: &str, original_label: String) {
        let doc = self.ctx.document().clone();
        let added = self.ctx.config().labels.added.clone();
        let delay = self.ctx.config().added_feedback;
        let target = target.to_string();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            doc.update(&target, |el| {
                if el.label == added {
                    el.label = original_label;
                    el.disabled = false;
                }
            });
        });
    }
}
