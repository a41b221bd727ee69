//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `SUBSCRIPTION_SYNC`
//! prefix and nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use subscription_sync::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod auth;
mod database;
mod error;
mod payment;
mod server;

pub use auth::AuthConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::{PaymentConfig, PriceEntry};
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (listen address, timeouts, logging)
    #[serde(default)]
    pub server: ServerConfig,

    /// PostgreSQL connection pool
    pub database: DatabaseConfig,

    /// Stripe and RevenueCat settings
    pub payment: PaymentConfig,

    /// Bearer token validation
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with the `SUBSCRIPTION_SYNC` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// - `SUBSCRIPTION_SYNC__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `SUBSCRIPTION_SYNC__PAYMENT__STRIPE_API_KEY=...` -> `payment.stripe_api_key = ...`
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("SUBSCRIPTION_SYNC")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.payment.validate()?;
        self.auth.validate(&self.server.environment)?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
