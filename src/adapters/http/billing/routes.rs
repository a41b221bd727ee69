//! Axum router configuration for billing endpoints.

use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::timeout::TimeoutLayer;

use crate::adapters::http::middleware::{auth_middleware, AuthState};

use super::handlers::{cancel_subscription, create_subscription, BillingAppState};
use super::webhooks::{revenuecat_webhook, stripe_webhook};

/// Webhook routes, mounted at `/webhooks`.
///
/// Requests exceeding `timeout` are dropped, which rolls back any open
/// transaction.
pub fn webhook_routes(timeout: Duration) -> Router<BillingAppState> {
    Router::new()
        .route("/stripe", post(stripe_webhook))
        .route("/revenuecat", post(revenuecat_webhook))
        .layer(TimeoutLayer::new(timeout))
}

/// Subscriber routes, mounted at `/api/v1/payments`. Require a bearer token.
pub fn payment_routes(auth: AuthState, timeout: Duration) -> Router<BillingAppState> {
    Router::new()
        .route("/create-subscription", get(create_subscription))
        .route("/cancel-subscription", post(cancel_subscription))
        .layer(middleware::from_fn_with_state(auth, auth_middleware))
        .layer(TimeoutLayer::new(timeout))
}

/// Per-surface request deadlines.
#[derive(Debug, Clone, Copy)]
pub struct RouteTimeouts {
    /// Subscriber API (checkout and cancel call out to Stripe)
    pub request: Duration,
    /// Provider webhooks
    pub webhook: Duration,
}

/// Combined billing router.
pub fn billing_router(auth: AuthState, timeouts: RouteTimeouts) -> Router<BillingAppState> {
    Router::new()
        .nest("/webhooks", webhook_routes(timeouts.webhook))
        .nest("/api/v1/payments", payment_routes(auth, timeouts.request))
}
