//! Payment configuration (Stripe and RevenueCat)

use serde::Deserialize;
use std::net::IpAddr;

use super::error::ValidationError;

/// Payment configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentConfig {
    /// Stripe secret API key
    pub stripe_api_key: String,

    #[serde(default = "default_stripe_api_base_url")]
    pub stripe_api_base_url: String,

    /// Stripe endpoint signing secret; enables signature verification
    #[serde(default)]
    pub stripe_webhook_secret: Option<String>,

    /// Addresses Stripe webhooks may come from (comma-separated)
    #[serde(default)]
    pub whitelisted_ips: String,

    /// Purchasable prices (comma-separated `price_id` or `price_id:name`).
    /// Checkout uses the first entry.
    #[serde(default)]
    pub prices: String,

    pub success_url: String,

    pub cancel_url: String,

    /// Expected `Authorization` value on RevenueCat webhooks
    pub revenuecat_auth_secret: String,
}

/// A configured price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceEntry {
    pub id: String,
    pub name: Option<String>,
}

impl PaymentConfig {
    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_test_")
    }

    /// Allowlisted webhook source addresses. Unparseable entries are skipped;
    /// `validate` rejects them.
    pub fn allowed_ips(&self) -> Vec<IpAddr> {
        split_list(&self.whitelisted_ips)
            .filter_map(|ip| ip.parse().ok())
            .collect()
    }

    pub fn price_entries(&self) -> Vec<PriceEntry> {
        split_list(&self.prices)
            .map(|entry| match entry.split_once(':') {
                Some((id, name)) => PriceEntry {
                    id: id.trim().to_string(),
                    name: Some(name.trim().to_string()).filter(|n| !n.is_empty()),
                },
                None => PriceEntry {
                    id: entry.to_string(),
                    name: None,
                },
            })
            .collect()
    }

    pub fn price_ids(&self) -> Vec<String> {
        self.price_entries().into_iter().map(|p| p.id).collect()
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.stripe_api_key.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__STRIPE_API_KEY"));
        }
        if !self.stripe_api_key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if let Some(secret) = &self.stripe_webhook_secret {
            if !secret.starts_with("whsec_") {
                return Err(ValidationError::InvalidStripeWebhookSecret);
            }
        }
        if self.revenuecat_auth_secret.is_empty() {
            return Err(ValidationError::MissingRequired(
                "PAYMENT__REVENUECAT_AUTH_SECRET",
            ));
        }

        for ip in split_list(&self.whitelisted_ips) {
            if ip.parse::<IpAddr>().is_err() {
                return Err(ValidationError::InvalidAllowlistAddress(ip.to_string()));
            }
        }
        if let Some(bad) = self.price_entries().iter().find(|p| p.id.is_empty()) {
            return Err(ValidationError::InvalidPriceEntry(format!("{:?}", bad)));
        }

        if !is_http_url(&self.success_url) {
            return Err(ValidationError::InvalidRedirectUrl("success_url"));
        }
        if !is_http_url(&self.cancel_url) {
            return Err(ValidationError::InvalidRedirectUrl("cancel_url"));
        }

        Ok(())
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

fn default_stripe_api_base_url() -> String {
    "https://api.stripe.com".to_string()
}
