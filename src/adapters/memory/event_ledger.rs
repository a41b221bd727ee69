//! In-memory EventLedger.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{RwLock, RwLockWriteGuard};

use crate::domain::billing::ProcessedEvent;
use crate::domain::foundation::DomainError;
use crate::ports::{EventLedger, SaveResult};

use super::injected;

#[derive(Default)]
pub(super) struct State {
    events: HashMap<String, ProcessedEvent>,
    failure: Option<String>,
}

impl State {
    pub(super) fn check(&self) -> Result<(), DomainError> {
        injected(&self.failure)
    }

    pub(super) fn contains(&self, event_id: &str) -> bool {
        self.events.contains_key(event_id)
    }

    pub(super) fn insert(&mut self, event: &ProcessedEvent) {
        self.events.insert(event.event_id.clone(), event.clone());
    }
}

#[derive(Default)]
pub struct InMemoryEventLedger {
    state: RwLock<State>,
}

impl InMemoryEventLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fail_with(&self, message: impl Into<String>) {
        self.state.write().await.failure = Some(message.into());
    }

    pub async fn recover(&self) {
        self.state.write().await.failure = None;
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.events.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn get(&self, event_id: &str) -> Option<ProcessedEvent> {
        self.state.read().await.events.get(event_id).cloned()
    }

    /// Exclusive access for a store that claims an event alongside its own
    /// write. Always taken before the store's lock.
    pub(super) async fn lock(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().await
    }
}

#[async_trait]
impl EventLedger for InMemoryEventLedger {
    async fn exists(&self, event_id: &str) -> Result<bool, DomainError> {
        let state = self.state.read().await;
        injected(&state.failure)?;
        Ok(state.events.contains_key(event_id))
    }

    async fn record(&self, event: &ProcessedEvent) -> Result<SaveResult, DomainError> {
        let mut state = self.state.write().await;
        state.check()?;
        if state.contains(&event.event_id) {
            return Ok(SaveResult::AlreadyExists);
        }
        state.insert(event);
        Ok(SaveResult::Inserted)
    }
}
