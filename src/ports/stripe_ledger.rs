//! StripeLedger port - Stripe customer, checkout session and invoice records.

use async_trait::async_trait;

use crate::domain::billing::{CheckoutSessionRecord, InvoiceRecord, StripeCustomer};
use crate::domain::foundation::{DomainError, UserId};

use super::SaveResult;

/// Port for Stripe bookkeeping tables.
#[async_trait]
pub trait StripeLedger: Send + Sync {
    async fn find_customer_by_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<StripeCustomer>, DomainError>;

    async fn find_customer(&self, customer_id: &str)
        -> Result<Option<StripeCustomer>, DomainError>;

    /// Insert a customer mapping. A user maps to at most one customer.
    async fn save_customer(&self, customer: &StripeCustomer) -> Result<(), DomainError>;

    async fn save_session(&self, session: &CheckoutSessionRecord) -> Result<(), DomainError>;

    /// Overwrite the stored status of a session.
    ///
    /// Returns false when no session with that id is known.
    async fn update_session_status(
        &self,
        session_id: &str,
        status: &str,
    ) -> Result<bool, DomainError>;

    async fn find_session(
        &self,
        session_id: &str,
    ) -> Result<Option<CheckoutSessionRecord>, DomainError>;

    /// Record a paid invoice. Invoices are write-once: a second delivery
    /// for the same invoice id leaves the first row untouched.
    async fn record_invoice(&self, invoice: &InvoiceRecord) -> Result<SaveResult, DomainError>;

    async fn find_invoice(&self, invoice_id: &str) -> Result<Option<InvoiceRecord>, DomainError>;
}
