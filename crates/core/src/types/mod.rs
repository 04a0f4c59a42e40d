//! Core types for the theme cart.
//!
//! This module provides type-safe wrappers for the cart domain.

pub mod cart;
pub mod id;
pub mod money;

pub use cart::{Cart, DEFAULT_VARIANT_TITLE, Discount, LineItem, normalize_image_url, variant_label};
pub use id::{LineKey, VariantId, VariantIdError};
pub use money::{AmountStyle, DEFAULT_MONEY_FORMAT, MoneyFormat, format_money, format_money_value};
