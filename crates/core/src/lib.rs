//! Bazaar Core - Shared domain types.
//!
//! This crate provides the types shared by every Bazaar component:
//! - `client` - Remote store access, session handling, favorites/cart reconciliation
//! - `cli` - Command-line front end
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no async.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, prices, products, favorites, cart lines, campaigns

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
