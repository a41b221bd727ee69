//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid listen address: {0}")]
    InvalidListenAddress(String),

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Webhook timeout must be between 1 and 120 seconds")]
    InvalidWebhookTimeout,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Invalid Stripe API key format")]
    InvalidStripeKey,

    #[error("Invalid Stripe webhook secret format")]
    InvalidStripeWebhookSecret,

    #[error("Invalid allowlisted address: {0}")]
    InvalidAllowlistAddress(String),

    #[error("Invalid price entry: {0}")]
    InvalidPriceEntry(String),

    #[error("Redirect URL must be absolute http(s): {0}")]
    InvalidRedirectUrl(&'static str),

    #[error("JWT secret must be at least 32 bytes in production")]
    JwtSecretTooShort,
}
