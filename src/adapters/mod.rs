//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `postgres` - PostgreSQL-backed stores
//! - `memory` - In-memory stores for tests and local runs
//! - `stripe` - Stripe REST client and webhook signature verification
//! - `auth` - Bearer token validation
//! - `http` - Axum routes, middleware and webhook endpoints

pub mod auth;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;
