//! SubscriptionStore port - Unified subscription rows and the legacy mirror.
//!
//! Every write to a Stripe subscription also writes the narrow legacy
//! mirror row in the same transaction. RevenueCat rows have no mirror.
//!
//! ## Concurrency
//!
//! `apply` reads the current row under a row lock, evaluates the status
//! gate, and writes in one transaction. Two concurrent deliveries for the
//! same subscription therefore serialize and the later writer wins.
//!
//! The `claim_and_*` variants also insert the RevenueCat event id into the
//! processed-event ledger inside that transaction. Either both the ledger
//! row and the change commit, or neither does. A caller dropped mid-write
//! leaves the event unclaimed so redelivery processes it again.

use async_trait::async_trait;

use crate::domain::billing::{
    MirrorSubscription, ProcessedEvent, Provider, Subscription, SubscriptionUpdate, UpdateOutcome,
};
use crate::domain::foundation::{DomainError, UserId};

use super::Claim;

/// Port for reading and writing unified subscriptions.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Insert or update a subscription keyed by id.
    ///
    /// On conflict every column except `created_at` is overwritten.
    /// Stripe rows also upsert the legacy mirror in the same transaction.
    async fn upsert(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Insert or update only the legacy mirror row.
    ///
    /// Used when a checkout completes for a customer with no known owner.
    async fn upsert_mirror(&self, mirror: &MirrorSubscription) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Subscription>, DomainError>;

    /// Most recently created active subscription for a user, any provider.
    async fn find_active_for_user(&self, user_id: UserId)
        -> Result<Option<Subscription>, DomainError>;

    /// Apply a targeted update to one subscription.
    ///
    /// `provider` selects whether the legacy mirror is kept in sync. When
    /// the unified row is missing, a Stripe mirror row with the same id is
    /// still updated for the columns it carries.
    async fn apply(
        &self,
        provider: Provider,
        id: &str,
        update: &SubscriptionUpdate,
    ) -> Result<UpdateOutcome, DomainError>;

    /// Record `event` and upsert `subscription` as one unit.
    ///
    /// Returns `Claim::AlreadyClaimed` without writing when the event id is
    /// already in the ledger.
    async fn claim_and_upsert(
        &self,
        event: &ProcessedEvent,
        subscription: &Subscription,
    ) -> Result<Claim<()>, DomainError>;

    /// Record `event` and run `apply` as one unit.
    ///
    /// A gated or missing row still claims the event.
    async fn claim_and_apply(
        &self,
        event: &ProcessedEvent,
        provider: Provider,
        id: &str,
        update: &SubscriptionUpdate,
    ) -> Result<Claim<UpdateOutcome>, DomainError>;

    /// Read the legacy mirror row for a Stripe subscription.
    async fn find_mirror(&self, id: &str) -> Result<Option<MirrorSubscription>, DomainError>;
}
