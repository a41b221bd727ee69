//! HTTP handlers for the subscriber-facing payment endpoints.
//!
//! These handlers connect Axum routes to the billing command handlers and
//! log what the core reports.

use std::sync::Arc;

use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};

use crate::adapters::http::middleware::RequireAuth;
use crate::application::handlers::billing::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CheckoutSettings, CreateCheckoutCommand,
    CreateCheckoutHandler, HandleRevenueCatWebhookHandler, HandleStripeWebhookHandler,
};
use crate::domain::billing::{BillingError, UpdateOutcome};
use crate::ports::{EventLedger, PaymentProvider, StripeLedger, SubscriptionStore, UserDirectory};

use super::dto::{CancelSubscriptionResponse, CheckoutResponse, ErrorResponse, HealthResponse};
use super::origin::WebhookGuard;

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for every billing route.
///
/// Cloned per request; all dependencies are behind `Arc`.
#[derive(Clone)]
pub struct BillingAppState {
    pub subscriptions: Arc<dyn SubscriptionStore>,
    pub stripe_ledger: Arc<dyn StripeLedger>,
    pub event_ledger: Arc<dyn EventLedger>,
    pub users: Arc<dyn UserDirectory>,
    pub payment_provider: Arc<dyn PaymentProvider>,
    pub checkout: CheckoutSettings,
    pub webhook_guard: Arc<WebhookGuard>,
}

impl BillingAppState {
    pub fn stripe_webhook_handler(&self) -> HandleStripeWebhookHandler {
        HandleStripeWebhookHandler::new(self.subscriptions.clone(), self.stripe_ledger.clone())
    }

    pub fn revenuecat_webhook_handler(&self) -> HandleRevenueCatWebhookHandler {
        HandleRevenueCatWebhookHandler::new(
            self.subscriptions.clone(),
            self.event_ledger.clone(),
            self.users.clone(),
        )
    }

    pub fn create_checkout_handler(&self) -> CreateCheckoutHandler {
        CreateCheckoutHandler::new(
            self.users.clone(),
            self.stripe_ledger.clone(),
            self.payment_provider.clone(),
            self.checkout.clone(),
        )
    }

    pub fn cancel_subscription_handler(&self) -> CancelSubscriptionHandler {
        CancelSubscriptionHandler::new(self.subscriptions.clone(), self.payment_provider.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Subscriber Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/v1/payments/create-subscription - Open a Stripe checkout
pub async fn create_subscription(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CheckoutResponse>, BillingApiError> {
    let user_id = user.id;
    let result = state
        .create_checkout_handler()
        .handle(CreateCheckoutCommand { user })
        .await?;

    if let Some(error) = &result.bookkeeping_error {
        tracing::error!(
            user_id = %user_id,
            session_id = %result.session_id,
            error = %error,
            "failed to record checkout session"
        );
    }
    tracing::info!(
        user_id = %user_id,
        customer_id = %result.customer_id,
        session_id = %result.session_id,
        customer_created = result.customer_created,
        "checkout session created"
    );

    Ok(Json(CheckoutResponse {
        session_url: result.session_url,
    }))
}

/// POST /api/v1/payments/cancel-subscription - Cancel the caller's subscription
pub async fn cancel_subscription(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CancelSubscriptionResponse>, BillingApiError> {
    let result = state
        .cancel_subscription_handler()
        .handle(CancelSubscriptionCommand { user_id: user.id })
        .await?;

    match (&result.local_update, &result.local_error) {
        (_, Some(error)) => tracing::error!(
            user_id = %user.id,
            subscription_id = %result.subscription_id,
            error = %error,
            "remote cancellation succeeded but local update failed"
        ),
        (Some(UpdateOutcome::Applied(_)), _) => tracing::info!(
            user_id = %user.id,
            subscription_id = %result.subscription_id,
            provider = %result.provider,
            "subscription cancelled"
        ),
        (Some(outcome), _) => tracing::warn!(
            user_id = %user.id,
            subscription_id = %result.subscription_id,
            outcome = ?outcome,
            "cancellation not applied locally"
        ),
        (None, None) => tracing::info!(
            user_id = %user.id,
            subscription_id = %result.subscription_id,
            "cancellation not deferred to period end; local status left active"
        ),
    }

    Ok(Json(CancelSubscriptionResponse {
        message: "Subscription cancelled".to_string(),
        provider: result.provider,
    }))
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts billing errors to HTTP responses.
#[derive(Debug)]
pub struct BillingApiError(pub BillingError);

impl From<BillingError> for BillingApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        match err.cause() {
            Some(cause) => tracing::error!(code = %err.code(), cause = %cause, "{}", err.message()),
            None => tracing::warn!(code = %err.code(), "{}", err.message()),
        }

        let body = ErrorResponse::new(err.code().to_string(), err.message());
        (err.status_code(), Json(body)).into_response()
    }
}
