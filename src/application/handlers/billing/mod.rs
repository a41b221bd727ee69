//! Billing handlers.
//!
//! ## Commands
//! - Reconciling Stripe webhook events
//! - Reconciling RevenueCat webhook events
//! - Opening a Stripe checkout session
//! - Cancelling the caller's active subscription

mod cancel_subscription;
mod create_checkout;
mod handle_revenuecat_webhook;
mod handle_stripe_webhook;

pub use cancel_subscription::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CancelSubscriptionResult,
};
pub use create_checkout::{
    CheckoutSettings, CreateCheckoutCommand, CreateCheckoutHandler, CreateCheckoutResult,
};
pub use handle_revenuecat_webhook::{
    HandleRevenueCatWebhookCommand, HandleRevenueCatWebhookHandler, Reconciliation,
    RevenueCatWebhookOutcome,
};
pub use handle_stripe_webhook::{
    HandleStripeWebhookCommand, HandleStripeWebhookHandler, StripeWebhookOutcome,
};
