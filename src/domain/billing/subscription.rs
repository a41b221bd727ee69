//! Unified subscription record and targeted updates.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CircleId, StateMachine, Timestamp, UserId, ValidationError};

use super::{Provider, SubscriptionStatus};

/// Years of entitlement granted by a confirmed Stripe checkout or invoice.
pub const STRIPE_TERM_YEARS: u32 = 1;

/// Expiry assigned when a checkout session is confirmed.
pub fn checkout_expiry(now: Timestamp) -> Timestamp {
    now.plus_years(STRIPE_TERM_YEARS)
}

/// Expiry assigned when an invoice for `period_end` is paid.
pub fn invoice_expiry(period_end: Timestamp) -> Timestamp {
    period_end.plus_years(STRIPE_TERM_YEARS)
}

/// Provider-agnostic entitlement record.
///
/// `id` is the Stripe subscription id or the store's original transaction
/// id. `(provider, external_subscription_id)` is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub user_id: UserId,
    pub circle_id: Option<CircleId>,
    pub provider: Provider,
    pub external_subscription_id: String,
    /// Stripe customer id or RevenueCat app user id.
    pub external_customer_id: String,
    pub product_id: Option<String>,
    pub status: SubscriptionStatus,
    pub expires_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// Opaque provider payload kept for forward compatibility.
    pub provider_data: Option<serde_json::Value>,
}

impl Subscription {
    /// Creates a new active subscription.
    pub fn activate(
        id: impl Into<String>,
        user_id: UserId,
        provider: Provider,
        external_customer_id: impl Into<String>,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::empty_field("subscription_id"));
        }
        Ok(Self {
            external_subscription_id: id.clone(),
            id,
            user_id,
            circle_id: None,
            provider,
            external_customer_id: external_customer_id.into(),
            product_id: None,
            status: SubscriptionStatus::Active,
            expires_at: None,
            created_at: now,
            updated_at: now,
            provider_data: None,
        })
    }

    pub fn with_circle(mut self, circle_id: Option<CircleId>) -> Self {
        self.circle_id = circle_id;
        self
    }

    pub fn with_product(mut self, product_id: Option<String>) -> Self {
        self.product_id = product_id.filter(|p| !p.is_empty());
        self
    }

    pub fn with_expiry(mut self, expires_at: Option<Timestamp>) -> Self {
        self.expires_at = expires_at;
        self
    }

    pub fn with_provider_data(mut self, data: serde_json::Value) -> Self {
        self.provider_data = Some(data);
        self
    }

    /// Applies a targeted update in place.
    ///
    /// Returns `Err` with the current status when the status gate rejects
    /// the change; nothing is modified in that case.
    pub fn apply(
        &mut self,
        update: &SubscriptionUpdate,
        now: Timestamp,
    ) -> Result<(), SubscriptionStatus> {
        if !update.permits(self.status) {
            return Err(self.status);
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(expires_at) = update.expires_at {
            self.expires_at = Some(expires_at);
        }
        if let Some(product_id) = &update.product_id {
            self.product_id = Some(product_id.clone());
        }
        if let Some(owner) = &update.owner {
            self.user_id = owner.user_id;
            self.external_customer_id = owner.external_customer_id.clone();
        }
        self.updated_at = now;
        Ok(())
    }
}

/// New owner for a transferred subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerChange {
    pub user_id: UserId,
    pub external_customer_id: String,
}

/// Column-level patch for one subscription row.
///
/// Only the fields that are `Some` are written. A `status` change is
/// gated by [`SubscriptionStatus`] transitions against the row's current
/// status at write time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionUpdate {
    pub status: Option<SubscriptionStatus>,
    pub expires_at: Option<Timestamp>,
    pub product_id: Option<String>,
    pub owner: Option<OwnerChange>,
}

impl SubscriptionUpdate {
    pub fn status(status: SubscriptionStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn with_expiry(mut self, expires_at: Option<Timestamp>) -> Self {
        self.expires_at = expires_at;
        self
    }

    pub fn with_product(mut self, product_id: impl Into<String>) -> Self {
        self.product_id = Some(product_id.into());
        self
    }

    pub fn transfer_to(mut self, user_id: UserId, external_customer_id: impl Into<String>) -> Self {
        self.owner = Some(OwnerChange {
            user_id,
            external_customer_id: external_customer_id.into(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.expires_at.is_none()
            && self.product_id.is_none()
            && self.owner.is_none()
    }

    /// Whether the legacy mirror carries any column this update writes.
    pub fn touches_mirror(&self) -> bool {
        self.status.is_some() || self.expires_at.is_some()
    }

    /// Status gate: may this update be applied to a row in `current`?
    pub fn permits(&self, current: SubscriptionStatus) -> bool {
        match self.status {
            Some(target) => current.can_transition_to(&target),
            None => true,
        }
    }
}

/// Result of a targeted update.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// The row was updated; carries the row as written.
    Applied(Subscription),

    /// The status gate rejected the change; nothing was written.
    Skipped {
        current: SubscriptionStatus,
        requested: SubscriptionStatus,
    },

    /// No unified row exists. `mirror_updated` reports whether a legacy
    /// mirror row with the same id was updated instead.
    NotFound { mirror_updated: bool },
}

impl UpdateOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, UpdateOutcome::Applied(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> Timestamp {
        Timestamp::from_unix_secs(secs).unwrap()
    }

    fn user(id: i64) -> UserId {
        UserId::new(id).unwrap()
    }

    fn active_sub() -> Subscription {
        Subscription::activate("sub_1", user(7), Provider::Stripe, "cus_1", ts(1_000)).unwrap()
    }

    #[test]
    fn activate_mirrors_id_into_external_subscription_id() {
        let sub = active_sub();
        assert_eq!(sub.id, "sub_1");
        assert_eq!(sub.external_subscription_id, "sub_1");
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.created_at, sub.updated_at);
    }

    #[test]
    fn activate_rejects_empty_id() {
        assert!(Subscription::activate(" ", user(1), Provider::Stripe, "cus", ts(0)).is_err());
    }

    #[test]
    fn with_product_drops_empty_strings() {
        let sub = active_sub().with_product(Some(String::new()));
        assert_eq!(sub.product_id, None);
    }

    #[test]
    fn checkout_expiry_is_one_year_out() {
        let now = ts(1705276800);
        assert_eq!(checkout_expiry(now), now.plus_years(1));
    }

    #[test]
    fn invoice_expiry_extends_period_end() {
        let period_end = ts(1707955200);
        assert_eq!(invoice_expiry(period_end), period_end.plus_years(1));
    }

    #[test]
    fn apply_writes_only_given_fields() {
        let mut sub = active_sub().with_product(Some("pro".to_string()));
        let update = SubscriptionUpdate::status(SubscriptionStatus::Cancelled);
        sub.apply(&update, ts(2_000)).unwrap();

        assert_eq!(sub.status, SubscriptionStatus::Cancelled);
        assert_eq!(sub.product_id.as_deref(), Some("pro"));
        assert_eq!(sub.updated_at, ts(2_000));
        assert_eq!(sub.created_at, ts(1_000));
    }

    #[test]
    fn apply_rejects_gated_transition() {
        let mut sub = active_sub();
        sub.status = SubscriptionStatus::Expired;
        let update = SubscriptionUpdate::status(SubscriptionStatus::Cancelled);

        assert_eq!(sub.apply(&update, ts(2_000)), Err(SubscriptionStatus::Expired));
        assert_eq!(sub.updated_at, ts(1_000));
    }

    #[test]
    fn transfer_changes_owner() {
        let mut sub = active_sub();
        let update = SubscriptionUpdate::default().transfer_to(user(9), "rc_9");
        sub.apply(&update, ts(2_000)).unwrap();
        assert_eq!(sub.user_id, user(9));
        assert_eq!(sub.external_customer_id, "rc_9");
        assert_eq!(sub.status, SubscriptionStatus::Active);
    }

    #[test]
    fn touches_mirror_only_for_status_or_expiry() {
        assert!(SubscriptionUpdate::status(SubscriptionStatus::Active).touches_mirror());
        assert!(!SubscriptionUpdate::default().with_product("p").touches_mirror());
        assert!(SubscriptionUpdate::default().is_empty());
    }
}
