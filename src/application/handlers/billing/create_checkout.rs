//! CreateCheckoutHandler - Opens a Stripe checkout session for a user.
//!
//! Flow:
//! 1. Load the user profile
//! 2. Reuse the user's Stripe customer, or create and record one
//! 3. Open a subscription checkout for the first configured price
//! 4. Record the session for later reconciliation

use std::sync::Arc;

use crate::domain::billing::{BillingError, CheckoutSessionRecord, StripeCustomer};
use crate::domain::foundation::{AuthenticatedUser, Timestamp};
use crate::ports::{
    CreateCheckoutRequest, CreateCustomerRequest, PaymentProvider, StripeLedger, UserDirectory,
};

/// Checkout parameters taken from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSettings {
    /// Configured price ids; checkout uses the first.
    pub price_ids: Vec<String>,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone)]
pub struct CreateCheckoutCommand {
    pub user: AuthenticatedUser,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCheckoutResult {
    pub session_id: String,
    pub session_url: String,
    pub customer_id: String,
    pub customer_created: bool,
    /// Set when the session could not be recorded locally. The session is
    /// still usable; its completion will update nothing in the session table.
    pub bookkeeping_error: Option<String>,
}

pub struct CreateCheckoutHandler {
    users: Arc<dyn UserDirectory>,
    ledger: Arc<dyn StripeLedger>,
    payment_provider: Arc<dyn PaymentProvider>,
    settings: CheckoutSettings,
}

impl CreateCheckoutHandler {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        ledger: Arc<dyn StripeLedger>,
        payment_provider: Arc<dyn PaymentProvider>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            users,
            ledger,
            payment_provider,
            settings,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateCheckoutCommand,
    ) -> Result<CreateCheckoutResult, BillingError> {
        let user_id = cmd.user.id;

        let profile = self
            .users
            .find_by_id(user_id)
            .await
            .map_err(|e| BillingError::UserLookupFailed(e.to_string()))?
            .ok_or_else(|| BillingError::UserLookupFailed(format!("user {} not found", user_id)))?;

        let existing = self
            .ledger
            .find_customer_by_user(user_id)
            .await
            .map_err(|e| BillingError::CustomerLookupFailed(e.to_string()))?;

        let (customer_id, customer_created) = match existing {
            Some(customer) => (customer.customer_id, false),
            None => {
                let customer = self
                    .payment_provider
                    .create_customer(CreateCustomerRequest {
                        user_id,
                        email: profile.email.clone().or(cmd.user.email.clone()),
                        name: profile.display_name.clone().or(cmd.user.display_name.clone()),
                    })
                    .await
                    .map_err(|e| BillingError::CustomerCreationFailed(e.to_string()))?;

                self.ledger
                    .save_customer(&StripeCustomer {
                        customer_id: customer.id.clone(),
                        user_id,
                        circle_id: profile.circle_id,
                        created_at: Timestamp::now(),
                    })
                    .await
                    .map_err(|e| BillingError::CustomerSaveFailed(e.to_string()))?;

                (customer.id, true)
            }
        };

        let price_id = self
            .settings
            .price_ids
            .first()
            .cloned()
            .ok_or(BillingError::NoPriceConfigured)?;

        let session = self
            .payment_provider
            .create_checkout_session(CreateCheckoutRequest {
                customer_id: customer_id.clone(),
                price_id,
                success_url: self.settings.success_url.clone(),
                cancel_url: self.settings.cancel_url.clone(),
            })
            .await
            .map_err(|e| BillingError::CheckoutSessionFailed(e.to_string()))?;

        let bookkeeping_error = self
            .ledger
            .save_session(&CheckoutSessionRecord {
                session_id: session.id.clone(),
                customer_id: customer_id.clone(),
                user_id,
                status: session.payment_status.clone(),
            })
            .await
            .err()
            .map(|e| e.to_string());

        Ok(CreateCheckoutResult {
            session_id: session.id,
            session_url: session.url,
            customer_id,
            customer_created,
            bookkeeping_error,
        })
    }
}
