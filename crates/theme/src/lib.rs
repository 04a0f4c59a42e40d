//! Theme cart layer.
//!
//! Keeps a page's cart UI (item-count badges, the cart drawer and the
//! add-to-cart controls) consistent with the server-side cart through the
//! storefront's cart AJAX endpoints. The server is the only source of truth:
//! every mutation round-trips and every display is rebuilt from the snapshot
//! it returns.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod dom;
pub mod drawer;
pub mod error;
pub mod events;
pub mod glue;
pub mod shopify;
pub mod state;
pub mod theme;

pub use config::ThemeConfig;
pub use dom::{Document, Element};
pub use error::{Result, ThemeError};
pub use events::{CartEvent, Key, Outcome, UiEvent};
pub use theme::Theme;
