//! Stripe adapter.
//!
//! - `StripePaymentAdapter` - `PaymentProvider` over the Stripe REST API
//! - `StripeSignatureVerifier` - `Stripe-Signature` header verification
//! - `MockPaymentProvider` - scripted provider for tests
//!
//! # Security
//!
//! - Webhook signatures use HMAC-SHA256 with constant-time comparison
//! - Timestamps are validated to prevent replay attacks (5-minute window)
//! - All secrets are handled via `secrecy::SecretString`

mod mock_payment_provider;
mod signature;
mod stripe_adapter;

pub use mock_payment_provider::{MethodCall, MockPaymentProvider};
pub use signature::{SignatureError, SignatureHeader, SignatureParseError, StripeSignatureVerifier};
pub use stripe_adapter::{StripeConfig, StripePaymentAdapter};
