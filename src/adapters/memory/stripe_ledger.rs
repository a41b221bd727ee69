//! In-memory StripeLedger.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::billing::{CheckoutSessionRecord, InvoiceRecord, StripeCustomer};
use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::ports::{SaveResult, StripeLedger};

use super::injected;

#[derive(Default)]
struct State {
    customers: HashMap<String, StripeCustomer>,
    sessions: HashMap<String, CheckoutSessionRecord>,
    invoices: HashMap<String, InvoiceRecord>,
    failure: Option<String>,
}

#[derive(Default)]
pub struct InMemoryStripeLedger {
    state: RwLock<State>,
}

impl InMemoryStripeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fail_with(&self, message: impl Into<String>) {
        self.state.write().await.failure = Some(message.into());
    }

    pub async fn recover(&self) {
        self.state.write().await.failure = None;
    }

    pub async fn invoice_count(&self) -> usize {
        self.state.read().await.invoices.len()
    }
}

#[async_trait]
impl StripeLedger for InMemoryStripeLedger {
    async fn find_customer_by_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<StripeCustomer>, DomainError> {
        let state = self.state.read().await;
        injected(&state.failure)?;
        Ok(state
            .customers
            .values()
            .find(|c| c.user_id == user_id)
            .cloned())
    }

    async fn find_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<StripeCustomer>, DomainError> {
        let state = self.state.read().await;
        injected(&state.failure)?;
        Ok(state.customers.get(customer_id).cloned())
    }

    async fn save_customer(&self, customer: &StripeCustomer) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        injected(&state.failure)?;
        let taken = state.customers.contains_key(&customer.customer_id)
            || state.customers.values().any(|c| c.user_id == customer.user_id);
        if taken {
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                "duplicate key value violates unique constraint",
            ));
        }
        state
            .customers
            .insert(customer.customer_id.clone(), customer.clone());
        Ok(())
    }

    async fn save_session(&self, session: &CheckoutSessionRecord) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        injected(&state.failure)?;
        state
            .sessions
            .entry(session.session_id.clone())
            .or_insert_with(|| session.clone());
        Ok(())
    }

    async fn update_session_status(
        &self,
        session_id: &str,
        status: &str,
    ) -> Result<bool, DomainError> {
        let mut state = self.state.write().await;
        injected(&state.failure)?;
        match state.sessions.get_mut(session_id) {
            Some(session) => {
                session.status = status.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_session(
        &self,
        session_id: &str,
    ) -> Result<Option<CheckoutSessionRecord>, DomainError> {
        let state = self.state.read().await;
        injected(&state.failure)?;
        Ok(state.sessions.get(session_id).cloned())
    }

    async fn record_invoice(&self, invoice: &InvoiceRecord) -> Result<SaveResult, DomainError> {
        let mut state = self.state.write().await;
        injected(&state.failure)?;
        if state.invoices.contains_key(&invoice.invoice_id) {
            return Ok(SaveResult::AlreadyExists);
        }
        state
            .invoices
            .insert(invoice.invoice_id.clone(), invoice.clone());
        Ok(SaveResult::Inserted)
    }

    async fn find_invoice(&self, invoice_id: &str) -> Result<Option<InvoiceRecord>, DomainError> {
        let state = self.state.read().await;
        injected(&state.failure)?;
        Ok(state.invoices.get(invoice_id).cloned())
    }
}
