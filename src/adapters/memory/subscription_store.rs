//! In-memory SubscriptionStore.
//!
//! Event claims go to a shared `InMemoryEventLedger`. A claiming write holds
//! the ledger lock and then the store lock, checks both for injected
//! failures, and only then mutates either.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::billing::{
    MirrorSubscription, ProcessedEvent, Provider, Subscription, SubscriptionStatus,
    SubscriptionUpdate, UpdateOutcome,
};
use crate::domain::foundation::{DomainError, Timestamp, UserId};
use crate::ports::{Claim, SubscriptionStore};

use super::{injected, InMemoryEventLedger};

#[derive(Default)]
struct State {
    /// Keyed by (provider, external subscription id).
    subscriptions: HashMap<(Provider, String), Subscription>,
    mirror: HashMap<String, MirrorSubscription>,
    failure: Option<String>,
}

impl State {
    fn upsert(&mut self, subscription: &Subscription) {
        let key = (subscription.provider, subscription.external_subscription_id.clone());
        let mut row = subscription.clone();
        if let Some(existing) = self.subscriptions.get(&key) {
            row.created_at = existing.created_at;
        }
        self.subscriptions.insert(key, row);

        if subscription.provider.has_legacy_mirror() {
            let mirror = MirrorSubscription::from(subscription);
            self.mirror.insert(mirror.subscription_id.clone(), mirror);
        }
    }

    fn apply(
        &mut self,
        provider: Provider,
        id: &str,
        update: &SubscriptionUpdate,
        now: Timestamp,
    ) -> UpdateOutcome {
        let Some(subscription) = self.subscriptions.values_mut().find(|s| s.id == id) else {
            let mut mirror_updated = false;
            if provider.has_legacy_mirror() && update.touches_mirror() {
                if let Some(row) = self.mirror.get_mut(id).filter(|row| update.permits(row.status)) {
                    if let Some(status) = update.status {
                        row.status = status;
                    }
                    if let Some(expires_at) = update.expires_at {
                        row.expired_at = Some(expires_at);
                    }
                    row.updated_at = now;
                    mirror_updated = true;
                }
            }
            return UpdateOutcome::NotFound { mirror_updated };
        };

        if let Err(current) = subscription.apply(update, now) {
            return UpdateOutcome::Skipped {
                current,
                requested: update.status.unwrap_or(current),
            };
        }

        let applied = subscription.clone();
        if applied.provider.has_legacy_mirror() && update.touches_mirror() {
            let row = MirrorSubscription::from(&applied);
            self.mirror.insert(row.subscription_id.clone(), row);
        }
        UpdateOutcome::Applied(applied)
    }
}

#[derive(Default)]
pub struct InMemorySubscriptionStore {
    state: RwLock<State>,
    events: Arc<InMemoryEventLedger>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose claiming writes record into `events`.
    pub fn with_event_ledger(events: Arc<InMemoryEventLedger>) -> Self {
        Self {
            state: RwLock::default(),
            events,
        }
    }

    /// Make every subsequent call fail with a database error.
    pub async fn fail_with(&self, message: impl Into<String>) {
        self.state.write().await.failure = Some(message.into());
    }

    pub async fn recover(&self) {
        self.state.write().await.failure = None;
    }

    /// Snapshot of every unified row.
    pub async fn all(&self) -> Vec<Subscription> {
        self.state.read().await.subscriptions.values().cloned().collect()
    }

    pub async fn mirror_count(&self) -> usize {
        self.state.read().await.mirror.len()
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn upsert(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        injected(&state.failure)?;
        state.upsert(subscription);
        Ok(())
    }

    async fn upsert_mirror(&self, mirror: &MirrorSubscription) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        injected(&state.failure)?;
        state
            .mirror
            .insert(mirror.subscription_id.clone(), mirror.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Subscription>, DomainError> {
        let state = self.state.read().await;
        injected(&state.failure)?;
        Ok(state.subscriptions.values().find(|s| s.id == id).cloned())
    }

    async fn find_active_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<Subscription>, DomainError> {
        let state = self.state.read().await;
        injected(&state.failure)?;
        Ok(state
            .subscriptions
            .values()
            .filter(|s| s.user_id == user_id && s.status == SubscriptionStatus::Active)
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn apply(
        &self,
        provider: Provider,
        id: &str,
        update: &SubscriptionUpdate,
    ) -> Result<UpdateOutcome, DomainError> {
        let now = Timestamp::now();
        let mut state = self.state.write().await;
        injected(&state.failure)?;
        Ok(state.apply(provider, id, update, now))
    }

    async fn claim_and_upsert(
        &self,
        event: &ProcessedEvent,
        subscription: &Subscription,
    ) -> Result<Claim<()>, DomainError> {
        let mut ledger = self.events.lock().await;
        ledger.check()?;
        if ledger.contains(&event.event_id) {
            return Ok(Claim::AlreadyClaimed);
        }
        let mut state = self.state.write().await;
        injected(&state.failure)?;

        state.upsert(subscription);
        ledger.insert(event);
        Ok(Claim::Won(()))
    }

    async fn claim_and_apply(
        &self,
        event: &ProcessedEvent,
        provider: Provider,
        id: &str,
        update: &SubscriptionUpdate,
    ) -> Result<Claim<UpdateOutcome>, DomainError> {
        let now = Timestamp::now();
        let mut ledger = self.events.lock().await;
        ledger.check()?;
        if ledger.contains(&event.event_id) {
            return Ok(Claim::AlreadyClaimed);
        }
        let mut state = self.state.write().await;
        injected(&state.failure)?;

        let outcome = state.apply(provider, id, update, now);
        ledger.insert(event);
        Ok(Claim::Won(outcome))
    }

    async fn find_mirror(&self, id: &str) -> Result<Option<MirrorSubscription>, DomainError> {
        let state = self.state.read().await;
        injected(&state.failure)?;
        Ok(state.mirror.get(id).cloned())
    }
}
