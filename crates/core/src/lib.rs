//! Bazaar Core - Shared domain types.
//!
//! This crate provides the types used across the Bazaar components:
//! - `storefront` - Public shop, cart, checkout, orders and invoices
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure business rules - no I/O, no
//! database access, no HTTP clients. Cart mutation, pagination arithmetic and
//! order totals live here so they can be tested without a store.
//!
//! # Modules
//!
//! - [`types`] - Ids, emails, prices, carts, pagination and order snapshots

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
