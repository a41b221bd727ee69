//! Payment provider port for the card checkout provider.
//!
//! Three direct remote calls with no internal retry: create a customer,
//! open a checkout session, and request cancellation at period end.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::UserId;

/// Outbound capability against the provider's API.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a customer in the payment system.
    async fn create_customer(&self, request: CreateCustomerRequest)
        -> Result<Customer, PaymentError>;

    /// Create a subscription-mode checkout session for one price.
    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Ask the provider to cancel at the end of the current period.
    ///
    /// The returned subscription reports whether the cancellation is
    /// actually deferred to period end.
    async fn cancel_at_period_end(
        &self,
        subscription_id: &str,
    ) -> Result<RemoteSubscription, PaymentError>;
}

/// Request to create a customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCustomerRequest {
    /// Internal user id, stored in the customer's metadata.
    pub user_id: UserId,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Customer as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub email: Option<String>,
}

/// Request to create a checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCheckoutRequest {
    pub customer_id: String,
    pub price_id: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// Checkout session as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// Redirect URL for the customer.
    pub url: String,
    /// `unpaid` for a fresh subscription session.
    pub payment_status: String,
    pub status: Option<String>,
}

/// Subscription state reported by the provider after a cancel request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSubscription {
    pub id: String,
    pub status: String,
    /// True when the cancellation takes effect at period end.
    pub cancel_at_period_end: bool,
}

/// Errors from payment provider operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentError {
    pub code: PaymentErrorCode,
    pub message: String,
    /// Provider's error code (if available).
    pub provider_code: Option<String>,
    pub retryable: bool,
}

impl PaymentError {
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::AuthenticationError, message)
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new(PaymentErrorCode::NotFound, format!("{} not found", resource))
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    NetworkError,
    AuthenticationError,
    InvalidRequest,
    NotFound,
    RateLimitExceeded,
    ProviderError,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError
                | PaymentErrorCode::RateLimitExceeded
                | PaymentErrorCode::ProviderError
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::InvalidRequest => "invalid_request",
            PaymentErrorCode::NotFound => "not_found",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::ProviderError => "provider_error",
        };
        write!(f, "{}", s)
    }
}
