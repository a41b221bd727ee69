//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` port over Stripe's form-encoded REST
//! API. Calls are made once; retrying is left to the caller.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::ports::{
    CheckoutSession, CreateCheckoutRequest, CreateCustomerRequest, Customer, PaymentError,
    PaymentErrorCode, PaymentProvider, RemoteSubscription,
};

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,
}

impl StripeConfig {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            api_base_url: "https://api.stripe.com".to_string(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

/// Stripe payment provider adapter.
pub struct StripePaymentAdapter {
    config: StripeConfig,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct StripeCustomerResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeSessionResponse {
    id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    payment_status: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeSubscriptionResponse {
    id: String,
    status: String,
    #[serde(default)]
    cancel_at_period_end: bool,
}

#[derive(Debug, Default, Deserialize)]
struct StripeErrorBody {
    #[serde(default)]
    error: StripeErrorDetail,
}

#[derive(Debug, Default, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// Maps a non-2xx Stripe response to a `PaymentError`.
fn error_from_response(status: u16, body: &str) -> PaymentError {
    let detail = serde_json::from_str::<StripeErrorBody>(body)
        .unwrap_or_default()
        .error;
    let message = detail
        .message
        .unwrap_or_else(|| format!("Stripe API error (HTTP {})", status));

    let code = match status {
        401 | 403 => PaymentErrorCode::AuthenticationError,
        404 => PaymentErrorCode::NotFound,
        429 => PaymentErrorCode::RateLimitExceeded,
        500..=599 => PaymentErrorCode::ProviderError,
        _ => PaymentErrorCode::InvalidRequest,
    };

    let error = PaymentError::new(code, message);
    match detail.code {
        Some(provider_code) => error.with_provider_code(provider_code),
        None => error,
    }
}

impl StripePaymentAdapter {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, PaymentError> {
        let url = format!("{}{}", self.config.api_base_url, path);

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(params)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_response(status.as_u16(), &body));
        }

        response.json().await.map_err(|e| {
            PaymentError::provider(format!("Failed to parse Stripe response: {}", e))
        })
    }
}

#[async_trait]
impl PaymentProvider for StripePaymentAdapter {
    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<Customer, PaymentError> {
        let mut params = vec![("metadata[user_id]", request.user_id.to_string())];
        if let Some(email) = &request.email {
            params.push(("email", email.clone()));
        }
        if let Some(name) = &request.name {
            params.push(("name", name.clone()));
        }

        let customer: StripeCustomerResponse = self.post_form("/v1/customers", &params).await?;

        Ok(Customer {
            id: customer.id,
            email: customer.email.or(request.email),
        })
    }

    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let params = vec![
            ("mode", "subscription".to_string()),
            ("customer", request.customer_id),
            ("line_items[0][price]", request.price_id),
            ("line_items[0][quantity]", "1".to_string()),
            ("success_url", request.success_url),
            ("cancel_url", request.cancel_url),
        ];

        let session: StripeSessionResponse =
            self.post_form("/v1/checkout/sessions", &params).await?;

        let url = session
            .url
            .ok_or_else(|| PaymentError::provider("Checkout session has no URL"))?;

        Ok(CheckoutSession {
            id: session.id,
            url,
            payment_status: session.payment_status.unwrap_or_else(|| "unpaid".to_string()),
            status: session.status,
        })
    }

    async fn cancel_at_period_end(
        &self,
        subscription_id: &str,
    ) -> Result<RemoteSubscription, PaymentError> {
        let path = format!("/v1/subscriptions/{}", subscription_id);
        let params = [("cancel_at_period_end", "true".to_string())];

        let subscription: StripeSubscriptionResponse = self.post_form(&path, &params).await?;

        Ok(RemoteSubscription {
            id: subscription.id,
            status: subscription.status,
            cancel_at_period_end: subscription.cancel_at_period_end,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_new_sets_default_base_url() {
        let config = StripeConfig::new(SecretString::new("sk_test".to_string()));
        assert_eq!(config.api_base_url, "https://api.stripe.com");
    }

    #[test]
    fn config_with_base_url_trims_trailing_slash() {
        let config = StripeConfig::new(SecretString::new("sk_test".to_string()))
            .with_base_url("http://localhost:12111/");
        assert_eq!(config.api_base_url, "http://localhost:12111");
    }

    #[test]
    fn error_body_is_decoded() {
        let body = r#"{"error":{"message":"No such subscription: 'sub_x'","code":"resource_missing","type":"invalid_request_error"}}"#;
        let err = error_from_response(404, body);

        assert_eq!(err.code, PaymentErrorCode::NotFound);
        assert_eq!(err.message, "No such subscription: 'sub_x'");
        assert_eq!(err.provider_code.as_deref(), Some("resource_missing"));
        assert!(!err.retryable);
    }

    #[test]
    fn status_codes_map_to_error_codes() {
        assert_eq!(error_from_response(401, "").code, PaymentErrorCode::AuthenticationError);
        assert_eq!(error_from_response(400, "{}").code, PaymentErrorCode::InvalidRequest);

        let limited = error_from_response(429, "not json");
        assert_eq!(limited.code, PaymentErrorCode::RateLimitExceeded);
        assert!(limited.retryable);

        let outage = error_from_response(503, "");
        assert!(outage.retryable);
        assert_eq!(outage.message, "Stripe API error (HTTP 503)");
    }

    #[test]
    fn subscription_response_defaults_cancel_flag() {
        let sub: StripeSubscriptionResponse =
            serde_json::from_str(r#"{"id":"sub_1","status":"active"}"#).unwrap();
        assert!(!sub.cancel_at_period_end);
    }
}
