//! Strongly-typed identifier value objects.
//!
//! Users and circles are owned by the surrounding application and are
//! addressed by positive integer keys.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// Internal user identifier. Always strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct UserId(i64);

impl UserId {
    /// Creates a new UserId, rejecting zero and negative values.
    pub fn new(id: i64) -> Result<Self, ValidationError> {
        if id <= 0 {
            return Err(ValidationError::not_positive("user_id", id.to_string()));
        }
        Ok(Self(id))
    }

    /// Returns the raw integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = ValidationError;

    /// Parses a decimal string with an optional leading `+`. Surrounding
    /// whitespace, `-` and other non-digit characters are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ValidationError::empty_field("user_id"));
        }
        let digits = s.strip_prefix('+').unwrap_or(s);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::not_positive("user_id", s));
        }
        let id = digits
            .parse::<i64>()
            .map_err(|e| ValidationError::invalid_format("user_id", e.to_string()))?;
        Self::new(id)
    }
}

impl TryFrom<i64> for UserId {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for i64 {
    fn from(id: UserId) -> Self {
        id.0
    }
}

/// Identifier of the household/circle a user belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CircleId(i64);

impl CircleId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for CircleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_accepts_positive_values() {
        let id = UserId::new(7).unwrap();
        assert_eq!(id.as_i64(), 7);
        assert_eq!(id.to_string(), "7");
    }

    #[test]
    fn user_id_rejects_zero_and_negative() {
        assert!(UserId::new(0).is_err());
        assert!(UserId::new(-3).is_err());
    }

    #[test]
    fn user_id_parses_decimal_strings() {
        assert_eq!("42".parse::<UserId>().unwrap().as_i64(), 42);
    }

    #[test]
    fn user_id_parse_rejects_non_numeric() {
        assert!("".parse::<UserId>().is_err());
        assert!("abc".parse::<UserId>().is_err());
        assert!("$RCAnonymousID:1f2e".parse::<UserId>().is_err());
        assert!("-5".parse::<UserId>().is_err());
        assert!("+".parse::<UserId>().is_err());
        assert!("+-5".parse::<UserId>().is_err());
        assert!(" 5".parse::<UserId>().is_err());
        assert!("0".parse::<UserId>().is_err());
    }

    #[test]
    fn user_id_parse_accepts_leading_plus() {
        assert_eq!("+7".parse::<UserId>().unwrap(), UserId::new(7).unwrap());
    }

    #[test]
    fn user_id_parse_rejects_overflow() {
        assert!("99999999999999999999".parse::<UserId>().is_err());
    }

    #[test]
    fn user_id_serializes_as_integer() {
        let id = UserId::new(12).unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "12");
        let back: UserId = serde_json::from_str("12").unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<UserId>("0").is_err());
    }

    #[test]
    fn circle_id_displays_inner_value() {
        assert_eq!(CircleId::new(3).to_string(), "3");
    }
}
