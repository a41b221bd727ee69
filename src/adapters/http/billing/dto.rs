//! HTTP DTOs for the subscriber-facing payment endpoints.

use serde::{Deserialize, Serialize};

use crate::domain::billing::Provider;

/// Response for `GET /api/v1/payments/create-subscription`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutResponse {
    /// Stripe-hosted checkout page to redirect the user to.
    #[serde(rename = "sessionURL")]
    pub session_url: String,
}

/// Response for `POST /api/v1/payments/cancel-subscription`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelSubscriptionResponse {
    pub message: String,
    pub provider: Provider,
}

/// Error body shared by every subscriber-facing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}
