//! Application layer - Commands and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Handlers own no state beyond their port handles.

pub mod handlers;

pub use handlers::billing::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CancelSubscriptionResult,
    CheckoutSettings, CreateCheckoutCommand, CreateCheckoutHandler, CreateCheckoutResult,
    HandleRevenueCatWebhookCommand, HandleRevenueCatWebhookHandler, HandleStripeWebhookCommand,
    HandleStripeWebhookHandler, Reconciliation, RevenueCatWebhookOutcome, StripeWebhookOutcome,
};
