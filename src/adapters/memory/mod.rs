//! In-memory adapters for tests and local runs without a database.
//!
//! Each store keeps its state behind a single `tokio::sync::RwLock`, so a
//! write is atomic with respect to every other call on the same store.
//! Stores support failure injection through `fail_with`.

mod event_ledger;
mod stripe_ledger;
mod subscription_store;
mod user_directory;

pub use event_ledger::InMemoryEventLedger;
pub use stripe_ledger::InMemoryStripeLedger;
pub use subscription_store::InMemorySubscriptionStore;
pub use user_directory::InMemoryUserDirectory;

use crate::domain::foundation::{DomainError, ErrorCode};

fn injected(failure: &Option<String>) -> Result<(), DomainError> {
    match failure {
        Some(message) => Err(DomainError::new(ErrorCode::DatabaseError, message.clone())),
        None => Ok(()),
    }
}
