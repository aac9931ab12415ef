//! Bazaar storefront library.
//!
//! Catalog, cart, checkout, orders and invoices behind an axum router. The
//! binary in `main.rs` wires this library to `PostgreSQL` and Stripe; tests
//! wire it to in-memory stores.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod payments;
pub mod routes;
pub mod services;
pub mod state;
