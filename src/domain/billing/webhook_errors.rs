//! Webhook ingest errors.
//!
//! Status mapping differs per provider: an undecodable Stripe body answers
//! 500 so Stripe redelivers, an undecodable RevenueCat body answers 400.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::DomainError;

use super::Provider;

/// Errors that end webhook processing before or during reconciliation.
#[derive(Debug, Clone, Error)]
pub enum WebhookError {
    /// Sender failed origin validation. No side effects were performed.
    #[error("Forbidden: {0}")]
    Forbidden(&'static str),

    /// Body could not be decoded into the expected shape.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// A store read or write failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl WebhookError {
    pub fn malformed(err: impl std::fmt::Display) -> Self {
        WebhookError::MalformedPayload(err.to_string())
    }

    /// Maps the error to the status code returned to `provider`.
    pub fn status_code(&self, provider: Provider) -> StatusCode {
        match (self, provider) {
            (WebhookError::Forbidden(_), _) => StatusCode::FORBIDDEN,
            (WebhookError::MalformedPayload(_), Provider::Stripe) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            (WebhookError::MalformedPayload(_), Provider::RevenueCat) => StatusCode::BAD_REQUEST,
            (WebhookError::Storage(_), _) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the provider is expected to deliver the event again.
    pub fn triggers_redelivery(&self, provider: Provider) -> bool {
        self.status_code(provider).is_server_error()
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        WebhookError::Storage(err.to_string())
    }
}
