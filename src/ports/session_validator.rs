//! Session validation port for bearer token validation.
//!
//! Subscriber-facing endpoints act on behalf of the authenticated user.
//! Implementations decode the token and map its subject to an internal
//! [`UserId`](crate::domain::foundation::UserId).
//!
//! # Contract
//!
//! Implementations must:
//! - Validate the token signature and expiry
//! - Return `AuthError::InvalidToken` for malformed or badly signed tokens
//! - Return `AuthError::TokenExpired` for expired tokens
//! - Return `AuthError::InvalidSubject` when the subject is not a positive integer

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser};

/// Validates access tokens and extracts user identity.
#[async_trait]
pub trait SessionValidator: Send + Sync {
    /// Validate a raw token (without the "Bearer " prefix).
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;
    use std::collections::HashMap;
    use std::sync::RwLock;

    struct TestSessionValidator {
        tokens: RwLock<HashMap<String, AuthenticatedUser>>,
    }

    #[async_trait]
    impl SessionValidator for TestSessionValidator {
        async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
            self.tokens
                .read()
                .unwrap()
                .get(token)
                .cloned()
                .ok_or(AuthError::InvalidToken)
        }
    }

    #[tokio::test]
    async fn returns_user_for_known_token() {
        let user = AuthenticatedUser::new(UserId::new(5).unwrap(), None, None);
        let validator = TestSessionValidator {
            tokens: RwLock::new(HashMap::from([("tok".to_string(), user.clone())])),
        };

        assert_eq!(validator.validate("tok").await.unwrap(), user);
        assert!(matches!(
            validator.validate("nope").await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn session_validator_trait_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn SessionValidator>();
    }
}
