//! Provider-specific ledger records.
//!
//! Stripe bookkeeping (customers, checkout sessions, invoices, the legacy
//! subscription mirror) and the RevenueCat processed-event ledger.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CircleId, Timestamp, UserId};

use super::{Subscription, SubscriptionStatus};

/// Maps an internal user to a Stripe customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StripeCustomer {
    pub customer_id: String,
    pub user_id: UserId,
    pub circle_id: Option<CircleId>,
    pub created_at: Timestamp,
}

/// An issued checkout attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSessionRecord {
    pub session_id: String,
    pub customer_id: String,
    pub user_id: UserId,
    /// Initially the session's payment status, later overwritten by the
    /// session status from the completion webhook.
    pub status: String,
}

/// Write-once billing entry for a paid invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub invoice_id: String,
    /// Amount paid in the currency's minor unit.
    pub amount: i64,
    pub currency: Option<String>,
    pub status: String,
    pub subscription_id: String,
    pub customer_id: String,
    pub period_start: Timestamp,
    pub period_end: Timestamp,
    pub received_at: Timestamp,
}

/// Narrow legacy copy of a Stripe subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorSubscription {
    pub subscription_id: String,
    pub customer_id: String,
    pub status: SubscriptionStatus,
    pub expired_at: Option<Timestamp>,
    pub updated_at: Timestamp,
}

impl From<&Subscription> for MirrorSubscription {
    fn from(sub: &Subscription) -> Self {
        Self {
            subscription_id: sub.id.clone(),
            customer_id: sub.external_customer_id.clone(),
            status: sub.status,
            expired_at: sub.expires_at,
            updated_at: sub.updated_at,
        }
    }
}

/// Idempotency ledger entry for a RevenueCat event. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedEvent {
    pub event_id: String,
    pub event_type: String,
    pub app_user_id: String,
    pub original_app_user_id: String,
    pub product_id: String,
    pub store: String,
    pub event_timestamp: Timestamp,
    pub processed_at: Timestamp,
}
