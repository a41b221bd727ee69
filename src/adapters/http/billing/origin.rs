//! Webhook origin checks.
//!
//! Stripe deliveries are accepted from allowlisted addresses, and when an
//! endpoint secret is configured they must also carry a valid
//! `Stripe-Signature`. RevenueCat deliveries must present the shared secret
//! in `Authorization`. A failed check ends the request with 403 before the
//! body is decoded.

use std::net::{IpAddr, SocketAddr};

use axum::http::{header, HeaderMap};
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

use crate::adapters::http::middleware::client_ip;
use crate::adapters::stripe::StripeSignatureVerifier;
use crate::domain::billing::WebhookError;

const STRIPE_SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Origin policy for both webhook endpoints.
pub struct WebhookGuard {
    allowed_ips: Vec<IpAddr>,
    trust_forwarded_for: bool,
    stripe_signature: Option<StripeSignatureVerifier>,
    revenuecat_secret: SecretString,
}

impl WebhookGuard {
    pub fn new(allowed_ips: Vec<IpAddr>, revenuecat_secret: SecretString) -> Self {
        Self {
            allowed_ips,
            trust_forwarded_for: false,
            stripe_signature: None,
            revenuecat_secret,
        }
    }

    /// Resolve the client from `X-Forwarded-For`/`X-Real-IP` first.
    pub fn trusting_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    /// Require a valid `Stripe-Signature` in addition to the allowlist.
    pub fn with_stripe_signature(mut self, verifier: StripeSignatureVerifier) -> Self {
        self.stripe_signature = Some(verifier);
        self
    }

    pub fn authorize_stripe(
        &self,
        headers: &HeaderMap,
        peer: Option<SocketAddr>,
        payload: &[u8],
        now: i64,
    ) -> Result<(), WebhookError> {
        let allowed = client_ip(headers, peer, self.trust_forwarded_for)
            .is_some_and(|ip| self.allowed_ips.contains(&ip));
        if !allowed {
            return Err(WebhookError::Forbidden("source address not allowlisted"));
        }

        if let Some(verifier) = &self.stripe_signature {
            let signature = headers
                .get(STRIPE_SIGNATURE_HEADER)
                .and_then(|h| h.to_str().ok())
                .ok_or(WebhookError::Forbidden("missing Stripe-Signature header"))?;
            verifier
                .verify(payload, signature, now)
                .map_err(|_| WebhookError::Forbidden("invalid Stripe-Signature"))?;
        }

        Ok(())
    }

    pub fn authorize_revenuecat(&self, headers: &HeaderMap) -> Result<(), WebhookError> {
        let expected = self.revenuecat_secret.expose_secret().as_bytes();
        let presented = headers
            .get(header::AUTHORIZATION)
            .map(|h| h.as_bytes())
            .unwrap_or_default();

        if expected.is_empty() || !bool::from(presented.ct_eq(expected)) {
            return Err(WebhookError::Forbidden("invalid authorization"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for WebhookGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookGuard")
            .field("allowed_ips", &self.allowed_ips)
            .field("trust_forwarded_for", &self.trust_forwarded_for)
            .field("stripe_signature", &self.stripe_signature.is_some())
            .finish_non_exhaustive()
    }
}
