//! HTTP adapter for billing.
//!
//! - `POST /webhooks/stripe` - Stripe events (allowlist, optional signature)
//! - `POST /webhooks/revenuecat` - RevenueCat events (shared secret)
//! - `GET /api/v1/payments/create-subscription` - Open a checkout session
//! - `POST /api/v1/payments/cancel-subscription` - Cancel the active subscription

pub mod dto;
pub mod handlers;
pub mod origin;
pub mod routes;
pub mod webhooks;

pub use handlers::{health, BillingApiError, BillingAppState};
pub use origin::WebhookGuard;
pub use routes::{billing_router, RouteTimeouts};
