//! Mock payment provider for testing.
//!
//! Supports:
//! - Pre-configured responses
//! - Error injection per method
//! - Call tracking

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::ports::{
    CheckoutSession, CreateCheckoutRequest, CreateCustomerRequest, Customer, PaymentError,
    PaymentProvider, RemoteSubscription,
};

/// Scripted `PaymentProvider`.
///
/// # Example
///
/// ```ignore
/// let mock = MockPaymentProvider::new();
/// mock.set_method_error("create_customer", PaymentError::network("down"));
/// assert!(mock.create_customer(request).await.is_err());
/// assert_eq!(mock.call_count("create_customer"), 1);
/// ```
#[derive(Clone, Default)]
pub struct MockPaymentProvider {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    next_customer: Option<Customer>,
    next_checkout: Option<CheckoutSession>,
    /// Cancel responses by subscription id.
    cancellations: HashMap<String, RemoteSubscription>,
    method_errors: HashMap<String, PaymentError>,
    call_log: Vec<MethodCall>,
    sequence: u64,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the customer to return on the next `create_customer` call.
    pub fn set_customer(&self, customer: Customer) {
        self.state().next_customer = Some(customer);
    }

    /// Set the checkout session to return on the next call.
    pub fn set_checkout_session(&self, session: CheckoutSession) {
        self.state().next_checkout = Some(session);
    }

    /// Set the response for cancelling `subscription.id`.
    pub fn set_cancellation(&self, subscription: RemoteSubscription) {
        self.state()
            .cancellations
            .insert(subscription.id.clone(), subscription);
    }

    /// Make every call to `method` fail with `error`.
    pub fn set_method_error(&self, method: &str, error: PaymentError) {
        self.state().method_errors.insert(method.to_string(), error);
    }

    pub fn clear_errors(&self) {
        self.state().method_errors.clear();
    }

    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.state().call_log.iter().any(|c| c.method == method)
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    fn record_call(&self, method: &str, args: Vec<String>) -> Result<MutexGuard<'_, MockState>, PaymentError> {
        let mut state = self.state();
        state.call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });
        if let Some(error) = state.method_errors.get(method) {
            return Err(error.clone());
        }
        state.sequence += 1;
        Ok(state)
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<Customer, PaymentError> {
        let mut state = self.record_call(
            "create_customer",
            vec![
                request.user_id.to_string(),
                request.email.clone().unwrap_or_default(),
            ],
        )?;
        let sequence = state.sequence;

        Ok(state.next_customer.take().unwrap_or_else(|| Customer {
            id: format!("cus_mock_{}", sequence),
            email: request.email,
        }))
    }

    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let mut state = self.record_call(
            "create_checkout_session",
            vec![request.customer_id.clone(), request.price_id.clone()],
        )?;
        let sequence = state.sequence;

        Ok(state.next_checkout.take().unwrap_or_else(|| {
            let id = format!("cs_mock_{}", sequence);
            CheckoutSession {
                url: format!("https://checkout.stripe.com/c/pay/{}", id),
                id,
                payment_status: "unpaid".to_string(),
                status: Some("open".to_string()),
            }
        }))
    }

    async fn cancel_at_period_end(
        &self,
        subscription_id: &str,
    ) -> Result<RemoteSubscription, PaymentError> {
        let state = self.record_call("cancel_at_period_end", vec![subscription_id.to_string()])?;

        Ok(state
            .cancellations
            .get(subscription_id)
            .cloned()
            .unwrap_or_else(|| RemoteSubscription {
                id: subscription_id.to_string(),
                status: "active".to_string(),
                cancel_at_period_end: true,
            }))
    }
}
