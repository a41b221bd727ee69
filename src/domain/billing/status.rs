//! Subscription status state machine.
//!
//! `absent` (no row yet) is not a status; creation always lands in
//! `Active`. Webhook-driven transitions are checked against this graph
//! before being written, so a stale delivery cannot move a row into a
//! state it could never legally reach.

use crate::domain::foundation::{StateMachine, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unified subscription status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Paid and entitled.
    Active,

    /// Cancelled by the user or the store. Entitlement runs to expiry.
    Cancelled,

    /// Period ended without renewal.
    Expired,

    /// The store could not charge the subscriber.
    BillingIssue,
}

impl SubscriptionStatus {
    pub const ALL: [SubscriptionStatus; 4] = [
        SubscriptionStatus::Active,
        SubscriptionStatus::Cancelled,
        SubscriptionStatus::Expired,
        SubscriptionStatus::BillingIssue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::BillingIssue => "billing_issue",
        }
    }

    /// Spelling used by the legacy Stripe mirror table.
    pub fn legacy_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Cancelled => "canceled",
            other => other.as_str(),
        }
    }
}

impl StateMachine for SubscriptionStatus {
    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Active => vec![Active, Cancelled, Expired, BillingIssue],
            BillingIssue => vec![Active, BillingIssue, Cancelled, Expired],
            Cancelled => vec![Cancelled, Active, Expired],
            Expired => vec![Expired, Active],
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ValidationError;

    /// Accepts both the unified and the legacy spelling.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SubscriptionStatus::Active),
            "cancelled" | "canceled" => Ok(SubscriptionStatus::Cancelled),
            "expired" => Ok(SubscriptionStatus::Expired),
            "billing_issue" => Ok(SubscriptionStatus::BillingIssue),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown subscription status '{}'", other),
            )),
        }
    }
}
