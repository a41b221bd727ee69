//! Top-level application router.

use axum::{http::HeaderName, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use super::billing::{billing_router, health, BillingAppState, RouteTimeouts};
use super::middleware::AuthState;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Builds the full router: billing routes, `/health`, tracing and request ids.
pub fn app_router(state: BillingAppState, auth: AuthState, timeouts: RouteTimeouts) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .route("/health", get(health))
        .merge(billing_router(auth, timeouts))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(request_id)),
        )
}
