//! CancelSubscriptionHandler - Cancels the caller's active subscription.
//!
//! Stripe subscriptions are cancelled remotely at period end and then marked
//! locally. Store-billed subscriptions are only marked locally; the store
//! owns the actual cancellation.

use std::sync::Arc;

use crate::domain::billing::{
    BillingError, Provider, SubscriptionStatus, SubscriptionUpdate, UpdateOutcome,
};
use crate::domain::foundation::UserId;
use crate::ports::{PaymentProvider, SubscriptionStore};

#[derive(Debug, Clone)]
pub struct CancelSubscriptionCommand {
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CancelSubscriptionResult {
    pub subscription_id: String,
    pub provider: Provider,
    /// Local update, when one was attempted and succeeded.
    pub local_update: Option<UpdateOutcome>,
    /// Local update failure after a successful remote cancel.
    pub local_error: Option<String>,
}

pub struct CancelSubscriptionHandler {
    subscriptions: Arc<dyn SubscriptionStore>,
    payment_provider: Arc<dyn PaymentProvider>,
}

impl CancelSubscriptionHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionStore>,
        payment_provider: Arc<dyn PaymentProvider>,
    ) -> Self {
        Self {
            subscriptions,
            payment_provider,
        }
    }

    pub async fn handle(
        &self,
        cmd: CancelSubscriptionCommand,
    ) -> Result<CancelSubscriptionResult, BillingError> {
        let subscription = self
            .subscriptions
            .find_active_for_user(cmd.user_id)
            .await
            .map_err(|e| BillingError::SubscriptionLookupFailed(e.to_string()))?
            .ok_or(BillingError::NoActiveSubscription(cmd.user_id))?;

        let cancel = SubscriptionUpdate::status(SubscriptionStatus::Cancelled);

        if subscription.provider == Provider::Stripe {
            let remote = self
                .payment_provider
                .cancel_at_period_end(&subscription.external_subscription_id)
                .await
                .map_err(|e| BillingError::CancellationFailed(e.to_string()))?;

            // The remote call succeeded; local bookkeeping failures are
            // reported without failing the request.
            let (local_update, local_error) = if remote.cancel_at_period_end {
                match self
                    .subscriptions
                    .apply(Provider::Stripe, &subscription.id, &cancel)
                    .await
                {
                    Ok(outcome) => (Some(outcome), None),
                    Err(e) => (None, Some(e.to_string())),
                }
            } else {
                (None, None)
            };

            return Ok(CancelSubscriptionResult {
                subscription_id: subscription.id,
                provider: Provider::Stripe,
                local_update,
                local_error,
            });
        }

        let outcome = self
            .subscriptions
            .apply(subscription.provider, &subscription.id, &cancel)
            .await
            .map_err(|e| BillingError::SubscriptionUpdateFailed(e.to_string()))?;

        Ok(CancelSubscriptionResult {
            subscription_id: subscription.id,
            provider: subscription.provider,
            local_update: Some(outcome),
            local_error: None,
        })
    }
}
