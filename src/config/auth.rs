//! Authentication configuration

use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

const MIN_PRODUCTION_SECRET_LEN: usize = 32;

/// Bearer token configuration (HS256 JWT)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret shared with the token issuer
    pub jwt_secret: String,

    /// Expected `iss` claim, if any
    #[serde(default)]
    pub issuer: Option<String>,
}

impl AuthConfig {
    /// Validate authentication configuration
    ///
    /// Production requires a secret of at least 32 bytes.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.jwt_secret.is_empty() {
            return Err(ValidationError::MissingRequired("AUTH__JWT_SECRET"));
        }
        if *environment == Environment::Production
            && self.jwt_secret.len() < MIN_PRODUCTION_SECRET_LEN
        {
            return Err(ValidationError::JwtSecretTooShort);
        }
        Ok(())
    }
}
