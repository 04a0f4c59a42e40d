//! Cart drawer controller.
//!
//! Owns the drawer's open/closed state and renders its content from server
//! snapshots. All line controls are handled by delegation from the drawer
//! root, so re-rendered content never needs rebinding.
//!
//! # Mutations
//!
//! A line with a request in flight is busy: its controls render disabled and
//! further events on them are refused with [`Outcome::Busy`]. This serializes
//! mutations per line. With the bulk `/cart/update.js` strategy every line is
//! busy, since the request echoes all displayed quantities.
//!
//! Mutations on different lines may overlap. Their responses are applied in
//! request order; one that lands after a later request's snapshot is dropped.
//! Once overlapping mutations have all settled the cart is re-fetched, since
//! the server may have processed them in either order.

pub mod view;

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use askama::Template;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, instrument, warn};

use theme_cart_core::{Cart, LineKey};

use crate::config::{CartType, UpdateStrategy};
use crate::dom::{Document, DrawerState, Element};
use crate::error::{ThemeError, add_breadcrumb};
use crate::events::{CartEvent, Key, Outcome, UiEvent};
use crate::shopify::{CartError, GENERIC_FAILURE, bulk_updates};
use crate::state::ThemeContext;

use view::{DrawerContentTemplate, DrawerView, quantity_id, row_id};

pub const CLOSE_ID: &str = "cart-drawer-close";
pub const OVERLAY_ID: &str = "cart-drawer-overlay";
pub const PANEL_ID: &str = "cart-drawer-panel";

#[derive(Debug, Default)]
struct InFlight {
    lines: HashSet<LineKey>,
    bulk: usize,
    /// A mutation started while another was in flight.
    overlapped: bool,
}

impl InFlight {
    fn is_idle(&self) -> bool {
        self.lines.is_empty() && self.bulk == 0
    }
}

/// Last snapshot rendered, with the stamp of the request that fetched it.
#[derive(Debug)]
struct Rendered {
    stamp: u64,
    cart: Cart,
}

/// The cart drawer.
///
/// Cheap to clone; clones control the same drawer.
#[derive(Clone)]
pub struct CartDrawer {
    ctx: ThemeContext,
    in_flight: Arc<Mutex<InFlight>>,
    rendered: Arc<Mutex<Rendered>>,
}

impl CartDrawer {
    /// Attach the drawer to the page.
    ///
    /// Registers the drawer chrome (close button, overlay, panel). With a
    /// page-style cart the drawer is hidden and never opens.
    #[must_use]
    pub fn new(ctx: ThemeContext) -> Self {
        let doc = ctx.document();
        doc.insert(
            OVERLAY_ID,
            Element::new("")
                .with_flag("data-cart-drawer-overlay")
                .inside_drawer(),
        );
        doc.insert(
            PANEL_ID,
            Element::new("")
                .with_flag("data-cart-drawer-panel")
                .inside_drawer(),
        );
        doc.insert(
            CLOSE_ID,
            Element::new("Close")
                .with_flag("data-cart-drawer-close")
                .inside_drawer(),
        );
        doc.set_drawer_state(DrawerState::Closed);
        doc.set_drawer_hidden(ctx.config().cart_type == CartType::Page);

        Self {
            ctx,
            in_flight: Arc::new(Mutex::new(InFlight::default())),
            rendered: Arc::new(Mutex::new(Rendered {
                stamp: 0,
                cart: Cart::empty(),
            })),
        }
    }

    fn in_flight(&self) -> MutexGuard<'_, InFlight> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.ctx.document().drawer_state() == DrawerState::Open
    }

    /// The snapshot the drawer last rendered.
    #[must_use]
    pub fn current(&self) -> Cart {
        self.rendered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cart
            .clone()
    }

    /// Whether a mutation on `key` is in flight.
    #[must_use]
    pub fn is_busy(&self, key: &LineKey) -> bool {
        let in_flight = self.in_flight();
        in_flight.bulk > 0 || in_flight.lines.contains(key)
    }

    // =========================================================================
    // Open / Close
    // =========================================================================

    /// Open the drawer and re-fetch its content.
    ///
    /// Calling it while open only re-fetches. The drawer never trusts content
    /// rendered before the fetch.
    #[instrument(skip(self))]
    pub async fn open(&self) -> Outcome {
        let doc = self.ctx.document();
        if doc.is_drawer_hidden() {
            debug!("Drawer is hidden on page-style carts");
            return Outcome::Ignored;
        }

        doc.set_drawer_state(DrawerState::Open);
        add_breadcrumb("cart", "Open drawer", None);

        match self.refresh().await {
            Ok(_) => Outcome::Applied,
            Err(e) => {
                warn!(error = %e, "Failed to refresh cart on open");
                let message = match &e {
                    ThemeError::Cart(err) => err.user_message(),
                    _ => GENERIC_FAILURE.to_string(),
                };
                doc.set_drawer_error(Some(message.clone()));
                Outcome::Failed(message)
            }
        }
    }

    /// Close the drawer and release the scroll lock.
    pub fn close(&self) -> Outcome {
        if !self.is_open() {
            return Outcome::Ignored;
        }
        self.ctx.document().set_drawer_state(DrawerState::Closed);
        Outcome::Applied
    }

    /// Fetch the cart, render it and publish it.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch or the render fails.
    pub async fn refresh(&self) -> Result<Cart, ThemeError> {
        let stamp = self.ctx.next_stamp();
        let cart = self.ctx.client().fetch_cart().await?;
        self.apply(stamp, &cart)?;
        Ok(cart)
    }

    /// Render a snapshot into the drawer and publish it to the page.
    ///
    /// `stamp` is the one taken before the request that fetched `cart`.
    /// Returns `false` when a later request's snapshot is already showing;
    /// nothing is touched then.
    ///
    /// # Errors
    ///
    /// Returns an error if the drawer template fails to render. Badges and
    /// listeners still receive the snapshot.
    pub fn apply(&self, stamp: u64, cart: &Cart) -> Result<bool, ThemeError> {
        let mut rendered = Ok(());
        let applied = self
            .ctx
            .apply(stamp, cart, |cart| rendered = self.render(stamp, cart));
        rendered.map(|()| applied)
    }

    /// Keep the open drawer in step with snapshots other components publish.
    ///
    /// Runs until the channel closes. Snapshots the drawer already rendered
    /// are skipped; a closed drawer re-fetches as it opens.
    pub async fn follow(self, mut events: broadcast::Receiver<CartEvent>) {
        loop {
            match events.recv().await {
                Ok(CartEvent::Changed { cart, stamp }) => {
                    if self.is_open()
                        && let Err(e) = self.render(stamp, &cart)
                    {
                        warn!(error = %e, "Failed to render published cart snapshot");
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Drawer listener skipped cart snapshots");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    /// Render a snapshot into the drawer, unless one from the same or a later
    /// request is already rendered.
    fn render(&self, stamp: u64, cart: &Cart) -> Result<(), ThemeError> {
        let mut rendered = self.rendered.lock().unwrap_or_else(PoisonError::into_inner);
        if stamp <= rendered.stamp {
            return Ok(());
        }

        let config = self.ctx.config();
        let view = DrawerView::new(
            cart,
            &config.money_format,
            &config.labels,
            &config.routes,
            |key| self.is_busy(key),
        );
        let controls = view.controls();
        let html = DrawerContentTemplate { drawer: view }.render()?;

        let doc = self.ctx.document();
        doc.replace_drawer_content(html, controls);
        doc.set_drawer_error(None);
        *rendered = Rendered {
            stamp,
            cart: cart.clone(),
        };
        Ok(())
    }

    // =========================================================================
    // Event delegation
    // =========================================================================

    /// Handle an event delegated to the drawer root.
    pub async fn handle(&self, event: &UiEvent) -> Outcome {
        match event {
            UiEvent::KeyDown { key: Key::Escape } => self.close(),
            UiEvent::KeyDown { .. } | UiEvent::Input { .. } => Outcome::Ignored,
            UiEvent::Click { target } => {
                let Some(element) = self.ctx.document().element(target) else {
                    return Outcome::Ignored;
                };
                self.handle_click(&element).await
            }
            UiEvent::Change { target, value } => {
                let Some(element) = self.ctx.document().element(target) else {
                    return Outcome::Ignored;
                };
                match element.line_key() {
                    Some(key) if element.has_attr("data-quantity-input") => {
                        self.set_quantity(&key, parse_quantity(value)).await
                    }
                    _ => Outcome::Ignored,
                }
            }
        }
    }

    async fn handle_click(&self, element: &Element) -> Outcome {
        if element.has_attr("data-cart-drawer-close") || element.has_attr("data-cart-drawer-overlay")
        {
            return self.close();
        }

        if element.has_attr("data-cart-checkout") {
            self.ctx
                .document()
                .navigate(self.ctx.config().routes.checkout.clone());
            return Outcome::Applied;
        }

        if element.has_attr("data-continue-shopping") {
            let href = element
                .attr("href")
                .map_or_else(|| self.ctx.config().routes.continue_shopping.clone(), str::to_string);
            self.ctx.document().navigate(href);
            return Outcome::Applied;
        }

        let Some(key) = element.line_key() else {
            return Outcome::Ignored;
        };

        if element.has_attr("data-increase-quantity") {
            self.step_quantity(&key, 1).await
        } else if element.has_attr("data-decrease-quantity") {
            self.step_quantity(&key, -1).await
        } else if element.has_attr("data-remove-item") {
            self.remove(&key).await
        } else {
            Outcome::Ignored
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Increment or decrement a line by `delta`, floored at zero.
    pub async fn step_quantity(&self, key: &LineKey, delta: i64) -> Outcome {
        let Some(current) = self.displayed_quantity(key) else {
            return Outcome::Ignored;
        };
        let candidate = u32::try_from((i64::from(current) + delta).max(0)).unwrap_or(u32::MAX);
        self.set_quantity(key, candidate).await
    }

    /// Commit a quantity for a line. Zero removes it.
    ///
    /// A value equal to the displayed quantity issues no request.
    #[instrument(skip(self))]
    pub async fn set_quantity(&self, key: &LineKey, candidate: u32) -> Outcome {
        let doc = self.ctx.document();
        let input_id = quantity_id(key);
        let Some(current) = self.displayed_quantity(key) else {
            return Outcome::Ignored;
        };

        if self.is_busy(key) {
            // Restore whatever was typed while the request was in flight.
            doc.set_value(&input_id, current.to_string());
            return Outcome::Busy;
        }

        if candidate == current {
            doc.set_value(&input_id, current.to_string());
            return Outcome::Ignored;
        }

        add_breadcrumb(
            "cart",
            "Change quantity",
            Some(&[("key", key.as_str()), ("quantity", candidate.to_string().as_str())]),
        );

        self.begin(key);
        show_quantity(doc, &input_id, candidate);

        let stamp = self.ctx.next_stamp();
        match self.commit(key, candidate).await {
            Ok(cart) => self.finish_success(key, stamp, &cart).await,
            Err(e) => {
                self.end(key);
                show_quantity(doc, &input_id, current);
                self.fail(&e, &self.ctx.config().labels.update_failed)
            }
        }
    }

    /// Remove a line.
    ///
    /// The row fades while the request is in flight and is only dropped once
    /// the server confirms; a failed removal restores it.
    #[instrument(skip(self))]
    pub async fn remove(&self, key: &LineKey) -> Outcome {
        let doc = self.ctx.document();
        if doc.element(&row_id(key)).is_none() {
            return Outcome::Ignored;
        }
        if self.is_busy(key) {
            return Outcome::Busy;
        }

        add_breadcrumb("cart", "Remove line", Some(&[("key", key.as_str())]));

        self.begin(key);
        doc.update(&row_id(key), |row| row.faded = true);

        let stamp = self.ctx.next_stamp();
        match self.commit(key, 0).await {
            Ok(cart) => self.finish_success(key, stamp, &cart).await,
            Err(e) => {
                self.end(key);
                doc.update(&row_id(key), |row| row.faded = false);
                self.fail(&e, &self.ctx.config().labels.remove_failed)
            }
        }
    }

    async fn commit(&self, key: &LineKey, quantity: u32) -> Result<Cart, CartError> {
        let client = self.ctx.client();
        match self.ctx.config().update_strategy {
            UpdateStrategy::Change => client.set_quantity(key, quantity).await,
            UpdateStrategy::Update => {
                let updates = bulk_updates(&self.displayed_lines(), key, quantity)
                    .ok_or_else(|| CartError::UnknownLine(key.to_string()))?;
                client.update_quantities(&updates).await
            }
        }
    }

    async fn finish_success(&self, key: &LineKey, stamp: u64, cart: &Cart) -> Outcome {
        let settled_overlap = self.end(key);
        let current = match self.apply(stamp, cart) {
            Ok(applied) => applied,
            Err(e) => {
                warn!(error = %e, "Failed to render cart snapshot");
                true
            }
        };

        if !current || settled_overlap {
            debug!(stamp, current, "Re-fetching cart after overlapping updates");
            if let Err(e) = self.refresh().await {
                warn!(error = %e, "Failed to re-fetch cart after overlapping updates");
            }
        }
        Outcome::Applied
    }

    /// Show a failed mutation inline. Shopper-facing rejections carry their
    /// own description; faults get the action's fallback text.
    fn fail(&self, err: &CartError, fallback: &str) -> Outcome {
        let message = if err.is_fault() {
            fallback.to_string()
        } else {
            err.user_message()
        };
        self.ctx.document().set_drawer_error(Some(message.clone()));
        Outcome::Failed(message)
    }

    /// Mark `key` in flight and disable its controls.
    fn begin(&self, key: &LineKey) {
        let bulk = self.ctx.config().update_strategy == UpdateStrategy::Update;
        {
            let mut in_flight = self.in_flight();
            if !in_flight.is_idle() {
                in_flight.overlapped = true;
            }
            if bulk {
                in_flight.bulk += 1;
            } else {
                in_flight.lines.insert(key.clone());
            }
        }
        self.sync_controls();
    }

    /// Clear the in-flight mark for `key` and re-enable what is no longer busy.
    ///
    /// Returns `true` when this was the last of a group of overlapping
    /// mutations.
    fn end(&self, key: &LineKey) -> bool {
        let bulk = self.ctx.config().update_strategy == UpdateStrategy::Update;
        let settled_overlap = {
            let mut in_flight = self.in_flight();
            if bulk {
                in_flight.bulk = in_flight.bulk.saturating_sub(1);
            } else {
                in_flight.lines.remove(key);
            }
            let settled = in_flight.is_idle() && in_flight.overlapped;
            if settled {
                in_flight.overlapped = false;
            }
            settled
        };
        self.sync_controls();
        settled_overlap
    }

    /// Align every line control's disabled flag with the in-flight set.
    fn sync_controls(&self) {
        let doc = self.ctx.document();
        for id in doc.query(|el| el.in_drawer && el.line_key().is_some()) {
            doc.update(&id, |el| {
                if let Some(key) = el.line_key() {
                    el.disabled = self.is_busy(&key);
                }
            });
        }
    }

    /// The committed quantity shown for a line.
    fn displayed_quantity(&self, key: &LineKey) -> Option<u32> {
        let input = self.ctx.document().element(&quantity_id(key))?;
        Some(
            input
                .attr("data-original-value")
                .or(input.value.as_deref())
                .map_or(0, parse_quantity),
        )
    }

    /// Every displayed line with its committed quantity, in line order.
    fn displayed_lines(&self) -> Vec<(LineKey, u32)> {
        let doc = self.ctx.document();
        doc.query(|el| el.has_attr("data-quantity-input"))
            .into_iter()
            .filter_map(|id| doc.element(&id))
            .filter_map(|input| {
                let key = input.line_key()?;
                let quantity = input.attr("data-original-value").map_or(0, parse_quantity);
                Some((key, quantity))
            })
            .collect()
    }
}

/// Reflect a quantity in a line's input, as value and committed value.
fn show_quantity(doc: &Document, input_id: &str, quantity: u32) {
    let text = quantity.to_string();
    doc.update(input_id, |input| {
        input.value = Some(text.clone());
        input.attrs.insert("data-original-value".to_string(), text.clone());
    });
}

/// Parse a typed quantity; anything non-numeric or negative clamps to zero.
#[must_use]
pub fn parse_quantity(value: &str) -> u32 {
    let value = value.trim();
    value.parse::<u32>().unwrap_or_else(|_| {
        value
            .parse::<i64>()
            .ok()
            .filter(|n| *n > 0)
            .map_or(0, |_| u32::MAX)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quantity_clamps() {
        assert_eq!(parse_quantity("3"), 3);
        assert_eq!(parse_quantity(" 7 "), 7);
        assert_eq!(parse_quantity("0"), 0);
        assert_eq!(parse_quantity("-2"), 0);
        assert_eq!(parse_quantity("abc"), 0);
        assert_eq!(parse_quantity(""), 0);
        assert_eq!(parse_quantity("99999999999"), u32::MAX);
    }
}
