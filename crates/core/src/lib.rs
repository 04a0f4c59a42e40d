//! Theme Cart Core - Shared types library.
//!
//! This crate provides the types shared by the theme cart components:
//! - `theme` - cart client, drawer controller and page glue
//! - `cli` - terminal driver for the same controllers
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no document state. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Cart snapshot, line keys, variant ids and money formatting

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
