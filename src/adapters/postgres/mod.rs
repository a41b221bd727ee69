//! PostgreSQL adapters - Database implementations for storage ports.
//!
//! - `PostgresSubscriptionStore` - Unified subscriptions plus the Stripe mirror
//! - `PostgresStripeLedger` - Stripe customers, sessions and invoices
//! - `PostgresEventLedger` - RevenueCat processed-event ledger
//! - `PostgresUserDirectory` - Read-only view of application users

mod event_ledger;
mod stripe_ledger;
mod subscription_store;
mod user_directory;

pub use event_ledger::PostgresEventLedger;
pub use stripe_ledger::PostgresStripeLedger;
pub use subscription_store::PostgresSubscriptionStore;
pub use user_directory::PostgresUserDirectory;
