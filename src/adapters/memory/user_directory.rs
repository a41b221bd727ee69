//! In-memory UserDirectory.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, UserId};
use crate::ports::{UserDirectory, UserProfile};

use super::injected;

#[derive(Default)]
struct State {
    users: HashMap<UserId, UserProfile>,
    failure: Option<String>,
}

#[derive(Default)]
pub struct InMemoryUserDirectory {
    state: RwLock<State>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, profile: UserProfile) {
        self.state.write().await.users.insert(profile.id, profile);
    }

    pub async fn fail_with(&self, message: impl Into<String>) {
        self.state.write().await.failure = Some(message.into());
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_id(&self, user_id: UserId) -> Result<Option<UserProfile>, DomainError> {
        let state = self.state.read().await;
        injected(&state.failure)?;
        Ok(state.users.get(&user_id).cloned())
    }
}
