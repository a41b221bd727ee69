//! Webhook endpoints.
//!
//! Both endpoints check the origin first, then hand the raw body to the
//! application handler and log the outcome it reports. Stripe answers 500
//! on undecodable bodies so it redelivers; RevenueCat answers 400.

use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::application::handlers::billing::{
    HandleRevenueCatWebhookCommand, HandleStripeWebhookCommand, Reconciliation,
    RevenueCatWebhookOutcome, StripeWebhookOutcome,
};
use crate::domain::billing::{Provider, UpdateOutcome, WebhookError};
use crate::domain::foundation::Timestamp;

use super::handlers::BillingAppState;

/// POST /webhooks/stripe
pub async fn stripe_webhook(
    State(state): State<BillingAppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let peer = connect_info.map(|ConnectInfo(addr)| addr);
    let now = Timestamp::now().as_unix_secs();

    if let Err(err) = state
        .webhook_guard
        .authorize_stripe(&headers, peer, &body, now)
    {
        tracing::warn!(peer = ?peer, error = %err, "stripe webhook rejected");
        return webhook_error(err, Provider::Stripe);
    }

    let outcome = state
        .stripe_webhook_handler()
        .handle(HandleStripeWebhookCommand {
            payload: body.to_vec(),
        })
        .await;

    match outcome {
        Ok(outcome) => {
            log_stripe_outcome(&outcome);
            StatusCode::OK.into_response()
        }
        Err(err) => {
            tracing::error!(error = %err, "stripe webhook failed");
            webhook_error(err, Provider::Stripe)
        }
    }
}

/// POST /webhooks/revenuecat
pub async fn revenuecat_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(err) = state.webhook_guard.authorize_revenuecat(&headers) {
        tracing::warn!(error = %err, "revenuecat webhook rejected");
        return webhook_error(err, Provider::RevenueCat);
    }

    let outcome = state
        .revenuecat_webhook_handler()
        .handle(HandleRevenueCatWebhookCommand {
            payload: body.to_vec(),
        })
        .await;

    match outcome {
        Ok(RevenueCatWebhookOutcome::AlreadyProcessed { event_id }) => {
            tracing::debug!(event_id = %event_id, "revenuecat event already processed");
            (StatusCode::OK, "Event already processed").into_response()
        }
        Ok(RevenueCatWebhookOutcome::Processed {
            event_id,
            reconciliation,
        }) => {
            log_reconciliation(&event_id, &reconciliation);
            (StatusCode::OK, "OK").into_response()
        }
        Ok(RevenueCatWebhookOutcome::DispatchFailed { event_id, error }) => {
            tracing::error!(
                event_id = %event_id,
                error = %error,
                "revenuecat event recorded but not applied; manual reconciliation required"
            );
            (StatusCode::OK, "OK").into_response()
        }
        Err(err) => {
            tracing::error!(error = %err, "revenuecat webhook failed");
            webhook_error(err, Provider::RevenueCat)
        }
    }
}

fn webhook_error(err: WebhookError, provider: Provider) -> Response {
    let status = err.status_code(provider);
    let message = match &err {
        WebhookError::Forbidden(_) => "Forbidden",
        WebhookError::MalformedPayload(_) => "Invalid payload",
        WebhookError::Storage(_) => "Internal server error",
    };
    (status, message).into_response()
}

fn log_update(subscription_id: &str, outcome: &UpdateOutcome) {
    match outcome {
        UpdateOutcome::Applied(sub) => tracing::info!(
            subscription_id = %subscription_id,
            status = %sub.status,
            "subscription updated"
        ),
        UpdateOutcome::Skipped { current, requested } => tracing::warn!(
            subscription_id = %subscription_id,
            current = %current,
            requested = %requested,
            "status transition skipped"
        ),
        UpdateOutcome::NotFound { mirror_updated } => tracing::warn!(
            subscription_id = %subscription_id,
            mirror_updated = *mirror_updated,
            "no subscription row for update"
        ),
    }
}

fn log_stripe_outcome(outcome: &StripeWebhookOutcome) {
    match outcome {
        StripeWebhookOutcome::SubscriptionActivated {
            subscription_id,
            user_id,
            session_updated,
        } => {
            tracing::info!(
                subscription_id = %subscription_id,
                user_id = %user_id,
                "subscription activated from checkout"
            );
            if !session_updated {
                tracing::warn!(subscription_id = %subscription_id, "checkout session row not found");
            }
        }
        StripeWebhookOutcome::MirrorActivated {
            subscription_id,
            customer_id,
            ..
        } => tracing::warn!(
            subscription_id = %subscription_id,
            customer_id = %customer_id,
            "checkout for unknown customer; only the legacy mirror was written"
        ),
        StripeWebhookOutcome::CheckoutNotConfirmed {
            session_id,
            payment_status,
            status,
        } => tracing::debug!(
            session_id = %session_id,
            payment_status = ?payment_status,
            status = ?status,
            "checkout not confirmed"
        ),
        StripeWebhookOutcome::CheckoutWithoutCustomer { session_id } => {
            tracing::warn!(session_id = %session_id, "confirmed checkout without customer")
        }
        StripeWebhookOutcome::InvoiceRecorded {
            invoice_id,
            subscription_id,
            first_delivery,
            update,
        } => {
            if !first_delivery {
                tracing::debug!(invoice_id = %invoice_id, "invoice already recorded");
            }
            log_update(subscription_id, update);
        }
        StripeWebhookOutcome::InvoiceWithoutSubscription { invoice_id } => {
            tracing::debug!(invoice_id = %invoice_id, "invoice without subscription")
        }
        StripeWebhookOutcome::Ignored { event_type } => {
            tracing::debug!(event_type = %event_type, "stripe event ignored")
        }
    }
}

fn log_reconciliation(event_id: &str, reconciliation: &Reconciliation) {
    match reconciliation {
        Reconciliation::Created {
            subscription_id,
            user_id,
        } => tracing::info!(
            event_id = %event_id,
            subscription_id = %subscription_id,
            user_id = %user_id,
            "subscription created from store purchase"
        ),
        Reconciliation::Updated {
            subscription_id,
            outcome,
        } => log_update(subscription_id, outcome),
        Reconciliation::UnresolvedUser { app_user_id } => tracing::warn!(
            event_id = %event_id,
            app_user_id = %app_user_id,
            "could not resolve internal user"
        ),
        Reconciliation::UnknownUser { user_id } => tracing::warn!(
            event_id = %event_id,
            user_id = %user_id,
            "store purchase for unknown user"
        ),
        Reconciliation::MissingTransaction { kind } => tracing::warn!(
            event_id = %event_id,
            kind = ?kind,
            "event carries no transactions"
        ),
        Reconciliation::NoStateChange { event_type } => tracing::debug!(
            event_id = %event_id,
            event_type = %event_type,
            "revenuecat event acknowledged"
        ),
    }
}
