//! EventLedger port - Idempotency tracking for RevenueCat events.
//!
//! RevenueCat retries any delivery that does not receive a 2xx, so the
//! same event id may arrive many times. The ledger is the only guard:
//! a claimed event id is never dispatched again.
//!
//! Events that change a subscription are claimed by the `SubscriptionStore`
//! in the same transaction as the change (see `Claim`). This port records
//! the events that change nothing and answers the duplicate check.

use async_trait::async_trait;

use crate::domain::billing::ProcessedEvent;
use crate::domain::foundation::DomainError;

/// Result of attempting to record an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// Record was inserted (first time seeing this id).
    Inserted,
    /// Record already exists (duplicate delivery).
    AlreadyExists,
}

/// Result of claiming an event id together with a state change.
#[derive(Debug, Clone, PartialEq)]
pub enum Claim<T> {
    /// The event id was recorded and the change committed with it.
    Won(T),
    /// Another delivery holds the id. Nothing was written.
    AlreadyClaimed,
}

/// Port for the processed-event ledger.
///
/// Implementations should use a primary key on `event_id` with
/// `ON CONFLICT DO NOTHING` so concurrent deliveries cannot both claim.
#[async_trait]
pub trait EventLedger: Send + Sync {
    /// Whether an event id has already been recorded.
    async fn exists(&self, event_id: &str) -> Result<bool, DomainError>;

    /// Claim an event id.
    ///
    /// Returns `SaveResult::AlreadyExists` if another delivery claimed it first.
    async fn record(&self, event: &ProcessedEvent) -> Result<SaveResult, DomainError>;
}
