//! Stripe webhook events.
//!
//! The body is decoded in two stages: a generic envelope that exposes the
//! `type` discriminator, then a payload scoped to that type. Types we do not
//! reconcile become [`StripeEvent::Ignored`] rather than an error.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

/// Generic Stripe event envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEnvelope {
    /// Event id (`evt_...`).
    pub id: String,

    #[serde(rename = "type")]
    pub event_type: String,

    #[serde(default)]
    pub created: i64,

    pub data: StripeEventData,

    #[serde(default)]
    pub livemode: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEventData {
    /// The object that triggered the event; its shape depends on `type`.
    pub object: serde_json::Value,
}

impl StripeEnvelope {
    pub fn from_slice(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }
}

/// A reference Stripe may send either as a bare id or as an expanded object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Expandable {
    Id(String),
    Object { id: String },
}

impl Expandable {
    pub fn id(&self) -> &str {
        match self {
            Expandable::Id(id) | Expandable::Object { id } => id,
        }
    }
}

fn expandable_id(value: &Option<Expandable>) -> Option<&str> {
    value.as_ref().map(Expandable::id).filter(|id| !id.is_empty())
}

/// `checkout.session.completed` payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub customer: Option<Expandable>,
    #[serde(default)]
    pub subscription: Option<Expandable>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl CheckoutSession {
    pub fn customer_id(&self) -> Option<&str> {
        expandable_id(&self.customer)
    }

    pub fn subscription_id(&self) -> Option<&str> {
        expandable_id(&self.subscription)
    }

    /// The subscription to activate, if and only if the session is paid,
    /// complete and carries a subscription id.
    pub fn confirmed_subscription_id(&self) -> Option<&str> {
        let paid = self.payment_status.as_deref() == Some("paid");
        let complete = self.status.as_deref() == Some("complete");
        if paid && complete {
            self.subscription_id()
        } else {
            None
        }
    }
}

/// `invoice.payment_succeeded` payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Invoice {
    pub id: String,
    #[serde(default)]
    pub customer: Option<Expandable>,
    #[serde(default)]
    pub subscription: Option<Expandable>,
    #[serde(default)]
    pub amount_paid: i64,
    #[serde(default)]
    pub currency: Option<String>,
    pub period_start: i64,
    pub period_end: i64,
}

impl Invoice {
    pub fn customer_id(&self) -> Option<&str> {
        expandable_id(&self.customer)
    }

    pub fn subscription_id(&self) -> Option<&str> {
        expandable_id(&self.subscription)
    }

    pub fn period_start(&self) -> Option<Timestamp> {
        Timestamp::from_unix_secs(self.period_start)
    }

    pub fn period_end(&self) -> Option<Timestamp> {
        Timestamp::from_unix_secs(self.period_end)
    }
}

/// Closed set of Stripe events this service reconciles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StripeEvent {
    CheckoutSessionCompleted(CheckoutSession),
    InvoicePaymentSucceeded(Invoice),
    /// Any other type; acknowledged without side effects.
    Ignored { event_type: String },
}

impl StripeEvent {
    pub const CHECKOUT_SESSION_COMPLETED: &'static str = "checkout.session.completed";
    pub const INVOICE_PAYMENT_SUCCEEDED: &'static str = "invoice.payment_succeeded";

    /// Decodes the type-specific payload carried by `envelope`.
    pub fn from_envelope(envelope: &StripeEnvelope) -> Result<Self, serde_json::Error> {
        let object = envelope.data.object.clone();
        match envelope.event_type.as_str() {
            Self::CHECKOUT_SESSION_COMPLETED => {
                Ok(Self::CheckoutSessionCompleted(serde_json::from_value(object)?))
            }
            Self::INVOICE_PAYMENT_SUCCEEDED => {
                Ok(Self::InvoicePaymentSucceeded(serde_json::from_value(object)?))
            }
            other => Ok(Self::Ignored {
                event_type: other.to_string(),
            }),
        }
    }

    pub fn event_type(&self) -> &str {
        match self {
            Self::CheckoutSessionCompleted(_) => Self::CHECKOUT_SESSION_COMPLETED,
            Self::InvoicePaymentSucceeded(_) => Self::INVOICE_PAYMENT_SUCCEEDED,
            Self::Ignored { event_type } => event_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(event_type: &str, object: serde_json::Value) -> StripeEnvelope {
        serde_json::from_value(json!({
            "id": "evt_1",
            "type": event_type,
            "created": 1705276800,
            "data": { "object": object },
            "livemode": false
        }))
        .unwrap()
    }

    #[test]
    fn checkout_session_accepts_bare_ids() {
        let env = envelope(
            "checkout.session.completed",
            json!({
                "id": "cs_1",
                "customer": "cus_1",
                "subscription": "sub_1",
                "payment_status": "paid",
                "status": "complete"
            }),
        );
        match StripeEvent::from_envelope(&env).unwrap() {
            StripeEvent::CheckoutSessionCompleted(session) => {
                assert_eq!(session.customer_id(), Some("cus_1"));
                assert_eq!(session.confirmed_subscription_id(), Some("sub_1"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn checkout_session_accepts_expanded_objects() {
        let env = envelope(
            "checkout.session.completed",
            json!({
                "id": "cs_1",
                "customer": { "id": "cus_1", "object": "customer" },
                "subscription": { "id": "sub_1", "object": "subscription", "status": "active" },
                "payment_status": "paid",
                "status": "complete"
            }),
        );
        let StripeEvent::CheckoutSessionCompleted(session) =
            StripeEvent::from_envelope(&env).unwrap()
        else {
            panic!("expected checkout session");
        };
        assert_eq!(session.subscription_id(), Some("sub_1"));
        assert_eq!(session.customer_id(), Some("cus_1"));
    }

    #[test]
    fn unpaid_session_is_not_confirmed() {
        let session: CheckoutSession = serde_json::from_value(json!({
            "id": "cs_1",
            "subscription": "sub_1",
            "payment_status": "unpaid",
            "status": "complete"
        }))
        .unwrap();
        assert_eq!(session.confirmed_subscription_id(), None);
    }

    #[test]
    fn open_session_is_not_confirmed() {
        let session: CheckoutSession = serde_json::from_value(json!({
            "id": "cs_1",
            "subscription": "sub_1",
            "payment_status": "paid",
            "status": "open"
        }))
        .unwrap();
        assert_eq!(session.confirmed_subscription_id(), None);
    }

    #[test]
    fn session_without_subscription_is_not_confirmed() {
        let session: CheckoutSession = serde_json::from_value(json!({
            "id": "cs_1",
            "subscription": "",
            "payment_status": "paid",
            "status": "complete"
        }))
        .unwrap();
        assert_eq!(session.confirmed_subscription_id(), None);

        let session: CheckoutSession = serde_json::from_value(json!({
            "id": "cs_2",
            "subscription": null,
            "payment_status": "paid",
            "status": "complete"
        }))
        .unwrap();
        assert_eq!(session.confirmed_subscription_id(), None);
    }

    #[test]
    fn invoice_payload_parses_periods() {
        let env = envelope(
            "invoice.payment_succeeded",
            json!({
                "id": "in_1",
                "customer": "cus_1",
                "subscription": "sub_1",
                "amount_paid": 4900,
                "currency": "usd",
                "period_start": 1705276800,
                "period_end": 1707955200
            }),
        );
        let StripeEvent::InvoicePaymentSucceeded(invoice) =
            StripeEvent::from_envelope(&env).unwrap()
        else {
            panic!("expected invoice");
        };
        assert_eq!(invoice.subscription_id(), Some("sub_1"));
        assert_eq!(invoice.amount_paid, 4900);
        assert_eq!(invoice.period_end().unwrap().as_unix_secs(), 1707955200);
    }

    #[test]
    fn malformed_invoice_is_an_error() {
        let env = envelope("invoice.payment_succeeded", json!({ "id": "in_1" }));
        assert!(StripeEvent::from_envelope(&env).is_err());
    }

    #[test]
    fn unknown_type_is_ignored() {
        let env = envelope("customer.created", json!({ "id": "cus_1" }));
        let event = StripeEvent::from_envelope(&env).unwrap();
        assert_eq!(
            event,
            StripeEvent::Ignored {
                event_type: "customer.created".to_string()
            }
        );
        assert_eq!(event.event_type(), "customer.created");
    }

    #[test]
    fn envelope_rejects_non_json() {
        assert!(StripeEnvelope::from_slice(b"not json").is_err());
    }
}
