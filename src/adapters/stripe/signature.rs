//! Stripe-Signature header verification.
//!
//! The header format is `t=<timestamp>,v1=<signature>[,v1=...][,v0=...]`.
//! The signed payload is `"{t}.{raw body}"`, HMAC-SHA256 keyed with the
//! endpoint's signing secret.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age for webhook events (5 minutes).
const MAX_TIMESTAMP_AGE_SECS: i64 = 300;

/// Clock skew tolerance for future timestamps (60 seconds).
const MAX_FUTURE_TOLERANCE_SECS: i64 = 60;

/// Error parsing the Stripe-Signature header.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureParseError {
    #[error("Missing Stripe-Signature header")]
    MissingHeader,
    #[error("Missing timestamp (t=) in signature")]
    MissingTimestamp,
    #[error("Missing v1 signature in header")]
    MissingV1Signature,
    #[error("Invalid timestamp format")]
    InvalidTimestamp,
    #[error("Invalid signature format (not valid hex)")]
    InvalidSignatureFormat,
}

/// Reasons a signed payload is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error(transparent)]
    Header(#[from] SignatureParseError),

    #[error("Event too old ({age_secs} seconds)")]
    TooOld { age_secs: i64 },

    #[error("Event timestamp in future")]
    FromFuture,

    #[error("Invalid signature")]
    Mismatch,
}

/// Parsed Stripe-Signature header components.
#[derive(Debug, Clone)]
pub struct SignatureHeader {
    /// Unix timestamp when Stripe signed the event.
    pub timestamp: i64,

    /// Every v1 signature present. Stripe sends more than one while a
    /// signing secret is being rolled.
    pub v1_signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> Result<Self, SignatureParseError> {
        if header.trim().is_empty() {
            return Err(SignatureParseError::MissingHeader);
        }

        let mut timestamp: Option<i64> = None;
        let mut v1_signatures = Vec::new();

        for part in header.split(',') {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            match key.trim() {
                "t" => {
                    timestamp = Some(
                        value
                            .trim()
                            .parse()
                            .map_err(|_| SignatureParseError::InvalidTimestamp)?,
                    );
                }
                "v1" => {
                    v1_signatures.push(
                        hex_decode(value).ok_or(SignatureParseError::InvalidSignatureFormat)?,
                    );
                }
                // v0 and unknown schemes are ignored.
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(SignatureParseError::MissingTimestamp)?;
        if v1_signatures.is_empty() {
            return Err(SignatureParseError::MissingV1Signature);
        }
        Ok(Self {
            timestamp,
            v1_signatures,
        })
    }
}

fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    let hex = hex.trim();
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| hex.get(i..i + 2).and_then(|b| u8::from_str_radix(b, 16).ok()))
        .collect()
}

pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Verifies Stripe webhook signatures for one endpoint secret.
#[derive(Clone)]
pub struct StripeSignatureVerifier {
    secret: SecretString,
}

impl StripeSignatureVerifier {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Verify `payload` against the raw header value at time `now`.
    pub fn verify(&self, payload: &[u8], header: &str, now: i64) -> Result<(), SignatureError> {
        let header = SignatureHeader::parse(header)?;

        let age_secs = now - header.timestamp;
        if age_secs > MAX_TIMESTAMP_AGE_SECS {
            return Err(SignatureError::TooOld { age_secs });
        }
        if age_secs < -MAX_FUTURE_TOLERANCE_SECS {
            return Err(SignatureError::FromFuture);
        }

        let expected = self.sign(header.timestamp, payload)?;
        let matched = header
            .v1_signatures
            .iter()
            .any(|candidate| bool::from(expected.as_slice().ct_eq(candidate.as_slice())));

        if matched {
            Ok(())
        } else {
            Err(SignatureError::Mismatch)
        }
    }

    fn sign(&self, timestamp: i64, payload: &[u8]) -> Result<Vec<u8>, SignatureError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| SignatureError::Mismatch)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    /// Builds a valid header for `payload`. Used by tests and local tooling.
    pub fn header_for(&self, payload: &[u8], timestamp: i64) -> String {
        match self.sign(timestamp, payload) {
            Ok(signature) => format!("t={},v1={}", timestamp, hex_encode(&signature)),
            Err(_) => format!("t={}", timestamp),
        }
    }
}
