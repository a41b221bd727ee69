//! Subscriber-facing billing errors.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | NoActiveSubscription | 404 |
//! | everything else | 500 |

use axum::http::StatusCode;

use crate::domain::foundation::{ErrorCode, UserId};

/// Failures of the checkout and cancellation endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    UserLookupFailed(String),
    CustomerLookupFailed(String),
    CustomerCreationFailed(String),
    CustomerSaveFailed(String),
    NoPriceConfigured,
    CheckoutSessionFailed(String),
    SubscriptionLookupFailed(String),
    NoActiveSubscription(UserId),
    CancellationFailed(String),
    SubscriptionUpdateFailed(String),
}

impl BillingError {
    /// Maps to the domain error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            BillingError::NoActiveSubscription(_) => ErrorCode::SubscriptionNotFound,
            BillingError::CustomerCreationFailed(_)
            | BillingError::CheckoutSessionFailed(_)
            | BillingError::CancellationFailed(_) => ErrorCode::PaymentProviderError,
            BillingError::NoPriceConfigured => ErrorCode::InternalError,
            _ => ErrorCode::DatabaseError,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            BillingError::NoActiveSubscription(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Caller-facing message. Underlying causes are logged, not returned.
    pub fn message(&self) -> &'static str {
        match self {
            BillingError::UserLookupFailed(_) => "Failed to get user",
            BillingError::CustomerLookupFailed(_) => "Failed to get customer",
            BillingError::CustomerCreationFailed(_) => "Failed to create customer",
            BillingError::CustomerSaveFailed(_) => "Failed to save customer",
            BillingError::NoPriceConfigured => "No price configured",
            BillingError::CheckoutSessionFailed(_) => "Failed to create checkout session",
            BillingError::SubscriptionLookupFailed(_) => "Failed to get subscription",
            BillingError::NoActiveSubscription(_) => "No active subscription found",
            BillingError::CancellationFailed(_) => "Failed to cancel subscription",
            BillingError::SubscriptionUpdateFailed(_) => "Failed to update subscription",
        }
    }

    /// Underlying cause, for logging.
    pub fn cause(&self) -> Option<&str> {
        match self {
            BillingError::UserLookupFailed(c)
            | BillingError::CustomerLookupFailed(c)
            | BillingError::CustomerCreationFailed(c)
            | BillingError::CustomerSaveFailed(c)
            | BillingError::CheckoutSessionFailed(c)
            | BillingError::SubscriptionLookupFailed(c)
            | BillingError::CancellationFailed(c)
            | BillingError::SubscriptionUpdateFailed(c) => Some(c),
            BillingError::NoPriceConfigured | BillingError::NoActiveSubscription(_) => None,
        }
    }
}

impl std::fmt::Display for BillingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.cause() {
            Some(cause) => write!(f, "{}: {}", self.message(), cause),
            None => f.write_str(self.message()),
        }
    }
}

impl std::error::Error for BillingError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_active_subscription_is_404() {
        let err = BillingError::NoActiveSubscription(UserId::new(7).unwrap());
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.message(), "No active subscription found");
        assert_eq!(err.code(), ErrorCode::SubscriptionNotFound);
    }

    #[test]
    fn provider_failures_are_500() {
        let err = BillingError::CancellationFailed("timeout".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "Failed to cancel subscription");
        assert_eq!(err.code(), ErrorCode::PaymentProviderError);
    }

    #[test]
    fn display_includes_cause() {
        let err = BillingError::CustomerSaveFailed("unique violation".to_string());
        assert_eq!(err.to_string(), "Failed to save customer: unique violation");
        assert_eq!(BillingError::NoPriceConfigured.to_string(), "No price configured");
    }

    #[test]
    fn checkout_messages() {
        assert_eq!(
            BillingError::CustomerCreationFailed(String::new()).message(),
            "Failed to create customer"
        );
        assert_eq!(
            BillingError::CustomerLookupFailed(String::new()).message(),
            "Failed to get customer"
        );
        assert_eq!(
            BillingError::CheckoutSessionFailed(String::new()).message(),
            "Failed to create checkout session"
        );
    }
}
