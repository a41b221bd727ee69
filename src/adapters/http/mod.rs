//! HTTP adapters - REST API implementations.
//!
//! - `billing` - webhook and subscriber payment endpoints
//! - `middleware` - authentication and client address resolution
//! - `router` - top-level router with tracing and request ids

pub mod billing;
pub mod middleware;
pub mod router;

pub use billing::{BillingAppState, WebhookGuard};
pub use router::app_router;
