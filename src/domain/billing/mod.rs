//! Billing domain - subscription entitlements fed by Stripe and RevenueCat.
//!
//! # Module Organization
//!
//! - `subscription` - Unified subscription record, targeted updates, expiry policy
//! - `status` - Subscription status state machine
//! - `provider` - Provider tag
//! - `ledger` - Stripe bookkeeping rows and the RevenueCat event ledger row
//! - `stripe_event` - Closed set of Stripe webhook events
//! - `revenuecat_event` - Closed set of RevenueCat webhook events
//! - `errors` / `webhook_errors` - Error taxonomies with HTTP mapping

mod errors;
mod ledger;
mod provider;
mod revenuecat_event;
mod status;
mod stripe_event;
mod subscription;
mod webhook_errors;

pub use errors::BillingError;
pub use ledger::{
    CheckoutSessionRecord, InvoiceRecord, MirrorSubscription, ProcessedEvent, StripeCustomer,
};
pub use provider::Provider;
pub use revenuecat_event::{
    ProductChange, Purchase, Renewal, RevenueCatEvent, RevenueCatEventKind,
    RevenueCatNotification, RevenueCatTransaction, RevenueCatWebhook, SubscriberAttribute,
    SubscriberAttributes, Transfer,
};
pub use status::SubscriptionStatus;
pub use stripe_event::{CheckoutSession, Expandable, Invoice, StripeEnvelope, StripeEvent, StripeEventData};
pub use subscription::{
    checkout_expiry, invoice_expiry, OwnerChange, Subscription, SubscriptionUpdate,
    UpdateOutcome, STRIPE_TERM_YEARS,
};
pub use webhook_errors::WebhookError;
