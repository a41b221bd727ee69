//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the billing core and the outside world. Adapters implement these ports.
//!
//! ## Storage Ports
//!
//! - `SubscriptionStore` - Unified subscription rows plus the Stripe mirror
//! - `StripeLedger` - Stripe customers, checkout sessions and invoices
//! - `EventLedger` - RevenueCat idempotency ledger
//!
//! ## External Service Ports
//!
//! - `PaymentProvider` - Stripe API calls
//! - `UserDirectory` - Users owned by the surrounding application
//! - `SessionValidator` - Bearer token validation

mod event_ledger;
mod payment_provider;
mod session_validator;
mod stripe_ledger;
mod subscription_store;
mod user_directory;

pub use event_ledger::{Claim, EventLedger, SaveResult};
pub use payment_provider::{
    CheckoutSession, CreateCheckoutRequest, CreateCustomerRequest, Customer, PaymentError,
    PaymentErrorCode, PaymentProvider, RemoteSubscription,
};
pub use session_validator::SessionValidator;
pub use stripe_ledger::StripeLedger;
pub use subscription_store::SubscriptionStore;
pub use user_directory::{UserDirectory, UserProfile};
