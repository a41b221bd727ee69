//! Payment provider tag.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// External payment system that owns a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Card checkout/subscription provider.
    Stripe,
    /// Mobile in-app purchase aggregator.
    RevenueCat,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Stripe => "stripe",
            Provider::RevenueCat => "revenuecat",
        }
    }

    /// Whether writes for this provider must also land in the legacy mirror.
    pub fn has_legacy_mirror(&self) -> bool {
        matches!(self, Provider::Stripe)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stripe" => Ok(Provider::Stripe),
            "revenuecat" => Ok(Provider::RevenueCat),
            other => Err(ValidationError::invalid_format(
                "provider",
                format!("unknown provider '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_round_trips_through_str() {
        for p in [Provider::Stripe, Provider::RevenueCat] {
            assert_eq!(p.as_str().parse::<Provider>().unwrap(), p);
        }
    }

    #[test]
    fn unknown_provider_is_rejected() {
        assert!("paypal".parse::<Provider>().is_err());
    }

    #[test]
    fn provider_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Provider::RevenueCat).unwrap(),
            "\"revenuecat\""
        );
    }

    #[test]
    fn only_stripe_has_legacy_mirror() {
        assert!(Provider::Stripe.has_legacy_mirror());
        assert!(!Provider::RevenueCat.has_legacy_mirror());
    }
}
