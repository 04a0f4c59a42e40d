//! Application context shared by the theme components.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;

use theme_cart_core::Cart;

use crate::config::ThemeConfig;
use crate::dom::Document;
use crate::events::{CartEvent, CartEvents};
use crate::shopify::{CartClient, CartError};

/// Context constructed once at page start and handed to each component.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// configuration, the cart client, the page and the change channel.
///
/// # Snapshot ordering
///
/// Every cart request takes a stamp from [`ThemeContext::next_stamp`] before
/// it is sent. A snapshot is applied only when no snapshot from a later
/// request has been applied yet, so a slow response can never overwrite the
/// page with an older cart.
#[derive(Clone)]
pub struct ThemeContext {
    inner: Arc<ThemeContextInner>,
}

struct ThemeContextInner {
    config: ThemeConfig,
    client: CartClient,
    document: Document,
    events: CartEvents,
    issued: AtomicU64,
    latest: Mutex<Latest>,
}

#[derive(Default)]
struct Latest {
    stamp: u64,
    cart: Option<Arc<Cart>>,
}

impl ThemeContext {
    /// Create the context for a page.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart client cannot be built.
    pub fn new(config: ThemeConfig, document: Document) -> Result<Self, CartError> {
        let client = CartClient::new(&config)?;

        Ok(Self {
            inner: Arc::new(ThemeContextInner {
                config,
                client,
                document,
                events: CartEvents::new(),
                issued: AtomicU64::new(0),
                latest: Mutex::new(Latest::default()),
            }),
        })
    }

    /// Get a reference to the theme configuration.
    #[must_use]
    pub fn config(&self) -> &ThemeConfig {
        &self.inner.config
    }

    /// Get a reference to the cart client.
    #[must_use]
    pub fn client(&self) -> &CartClient {
        &self.inner.client
    }

    /// Get a reference to the page.
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.inner.document
    }

    /// Listen for cart snapshots.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.inner.events.subscribe()
    }

    /// Stamp for a request about to be sent. Later requests get larger stamps.
    #[must_use]
    pub fn next_stamp(&self) -> u64 {
        self.inner.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// The most recently applied snapshot, if any.
    #[must_use]
    pub fn latest(&self) -> Option<Arc<Cart>> {
        self.inner
            .latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cart
            .clone()
    }

    /// Make `cart`, fetched by the request stamped `stamp`, the page's
    /// current truth.
    ///
    /// Runs `render` with the snapshot, writes every badge from it and
    /// notifies listeners. Returns `false` without touching the page when a
    /// snapshot from a later request has already been applied.
    ///
    /// This is the only place badge counts are written.
    pub fn apply(&self, stamp: u64, cart: &Cart, render: impl FnOnce(&Cart)) -> bool {
        let mut latest = self
            .inner
            .latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if stamp < latest.stamp {
            tracing::debug!(stamp, newest = latest.stamp, "Dropping stale cart snapshot");
            return false;
        }

        let snapshot = Arc::new(cart.clone());
        latest.stamp = stamp;
        latest.cart = Some(Arc::clone(&snapshot));

        render(cart);
        let badges = self.inner.document.set_badges(cart.item_count);
        let listeners = self.inner.events.publish(stamp, snapshot);
        tracing::debug!(
            stamp,
            item_count = cart.item_count,
            badges,
            listeners,
            "Published cart snapshot"
        );
        true
    }

    /// Publish a snapshot obtained outside the theme components, e.g. by a
    /// mini-cart widget. It counts as the newest request.
    pub fn publish(&self, cart: &Cart) -> bool {
        let stamp = self.next_stamp();
        self.apply(stamp, cart, |_| {})
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use url::Url;

    use crate::dom::{ATTR_CART_COUNT, Element};

    fn context() -> ThemeContext {
        let doc = Document::new();
        doc.insert("count", Element::new("0").with_flag(ATTR_CART_COUNT));
        let config = ThemeConfig::new(Url::parse("https://shop.example.com").unwrap());
        ThemeContext::new(config, doc).unwrap()
    }

    fn cart(item_count: u32) -> Cart {
        Cart {
            item_count,
            ..Cart::default()
        }
    }

    #[test]
    fn test_stamps_increase() {
        let ctx = context();
        let first = ctx.next_stamp();
        assert!(ctx.next_stamp() > first);
    }

    #[test]
    fn test_older_snapshot_is_dropped() {
        let ctx = context();
        let older = ctx.next_stamp();
        let newer = ctx.next_stamp();

        assert!(ctx.apply(newer, &cart(4), |_| {}));
        let mut rendered = false;
        assert!(!ctx.apply(older, &cart(3), |_| rendered = true));

        assert!(!rendered);
        assert_eq!(ctx.document().badge_texts(), vec!["4"]);
        assert_eq!(ctx.latest().unwrap().item_count, 4);
    }

    #[test]
    fn test_publish_counts_as_newest() {
        let ctx = context();
        let pending = ctx.next_stamp();
        assert!(ctx.publish(&cart(2)));
        assert!(!ctx.apply(pending, &cart(1), |_| {}));
        assert_eq!(ctx.document().badge_texts(), vec!["2"]);
    }
}
