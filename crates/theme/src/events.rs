//! UI events, handler outcomes and the page-wide "cart changed" channel.

use std::sync::Arc;

use tokio::sync::broadcast;

use theme_cart_core::Cart;

/// Capacity of the change channel; slow listeners skip to the newest snapshot.
const CHANNEL_CAPACITY: usize = 16;

/// Keys the drawer reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Escape,
    Enter,
    Other(String),
}

/// A user interaction, addressed to the element it happened on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Click { target: String },
    /// Keystroke-level edit of an input; never committed to the server.
    Input { target: String, value: String },
    /// Committed edit (blur or enter) of an input.
    Change { target: String, value: String },
    KeyDown { key: Key },
}

impl UiEvent {
    #[must_use]
    pub fn click(target: impl Into<String>) -> Self {
        Self::Click {
            target: target.into(),
        }
    }

    #[must_use]
    pub fn input(target: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Input {
            target: target.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn change(target: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Change {
            target: target.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub const fn key(key: Key) -> Self {
        Self::KeyDown { key }
    }

    /// The element the event was fired on.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Click { target } | Self::Input { target, .. } | Self::Change { target, .. } => {
                Some(target)
            }
            Self::KeyDown { .. } => None,
        }
    }
}

/// What a handler did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Not addressed to this handler, or nothing to do.
    Ignored,
    /// The control is disabled while a request is in flight.
    Busy,
    /// Aborted before any request (missing or invalid attributes).
    Invalid,
    /// State changed; for cart actions, the server accepted the request.
    Applied,
    /// The server call failed; UI was rolled back and the message shown.
    Failed(String),
}

/// Notification published after every fresh snapshot.
#[derive(Debug, Clone)]
pub enum CartEvent {
    /// `stamp` orders snapshots by the request that fetched them.
    Changed { cart: Arc<Cart>, stamp: u64 },
}

/// Page-wide broadcast of cart snapshots.
#[derive(Debug, Clone)]
pub struct CartEvents {
    sender: broadcast::Sender<CartEvent>,
}

impl Default for CartEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl CartEvents {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Register a listener.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.sender.subscribe()
    }

    /// Publish a snapshot. Returns the number of listeners reached.
    pub fn publish(&self, stamp: u64, cart: Arc<Cart>) -> usize {
        // No listeners is not an error: the badges are written regardless.
        self.sender
            .send(CartEvent::Changed { cart, stamp })
            .unwrap_or(0)
    }
}
