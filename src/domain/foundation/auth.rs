//! Authentication types for the domain layer.
//!
//! `AuthenticatedUser` is what the subscriber-facing endpoints act on. Any
//! token validator can populate it through the `SessionValidator` port.

use super::UserId;
use thiserror::Error;

/// Authenticated caller extracted from a validated bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Internal user id (the token subject).
    pub id: UserId,

    /// Email address from the token claims, if present.
    pub email: Option<String>,

    /// Display name if available.
    pub display_name: Option<String>,
}

impl AuthenticatedUser {
    pub fn new(id: UserId, email: Option<String>, display_name: Option<String>) -> Self {
        Self {
            id,
            email,
            display_name,
        }
    }
}

/// Authentication errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The token is missing, malformed, or has an invalid signature.
    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    /// Token subject is not a usable internal user id.
    #[error("Invalid token subject")]
    InvalidSubject,
}

impl AuthError {
    /// Returns true if this error indicates the user should re-authenticate.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, AuthError::InvalidToken | AuthError::TokenExpired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authenticated_user_new_creates_user() {
        let user = AuthenticatedUser::new(
            UserId::new(7).unwrap(),
            Some("seven@example.com".to_string()),
            None,
        );
        assert_eq!(user.id.as_i64(), 7);
        assert_eq!(user.email.as_deref(), Some("seven@example.com"));
    }

    #[test]
    fn auth_error_displays_correctly() {
        assert_eq!(AuthError::InvalidToken.to_string(), "Invalid or expired token");
        assert_eq!(AuthError::InvalidSubject.to_string(), "Invalid token subject");
    }

    #[test]
    fn auth_error_requires_reauthentication_for_token_errors() {
        assert!(AuthError::InvalidToken.requires_reauthentication());
        assert!(AuthError::TokenExpired.requires_reauthentication());
        assert!(!AuthError::InvalidSubject.requires_reauthentication());
    }
}
