//! RevenueCat webhook events.
//!
//! [`RevenueCatNotification`] is the wire shape. [`RevenueCatNotification::classify`]
//! turns it into the closed [`RevenueCatEvent`] set, each variant carrying
//! only what its reconciliation step needs.

use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::foundation::{Timestamp, UserId};

use super::ProcessedEvent;

/// Treats an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Webhook body: `{ "api_version": "...", "event": { ... } }`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RevenueCatWebhook {
    #[serde(default, deserialize_with = "null_as_default")]
    pub api_version: String,
    pub event: RevenueCatNotification,
}

impl RevenueCatWebhook {
    pub fn from_slice(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SubscriberAttribute {
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub updated_at_ms: i64,
}

/// Only the `$userId` attribute is read; everything else is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SubscriberAttributes {
    #[serde(rename = "$userId", default)]
    pub user_id: Option<SubscriberAttribute>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RevenueCatTransaction {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub original_transaction_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub product_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub purchase_date_ms: i64,
    #[serde(default)]
    pub expires_date_ms: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_trial_period: bool,
    #[serde(default)]
    pub auto_renew_status: Option<bool>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub period_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub store: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub environment: String,
}

/// The `event` object of a RevenueCat webhook.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RevenueCatNotification {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub event_timestamp_ms: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub app_user_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub original_app_user_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub product_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub entitlement_ids: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub store: String,
    #[serde(default)]
    pub purchased_at_ms: Option<i64>,
    #[serde(default)]
    pub expiration_at_ms: Option<i64>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subscriber_attributes: SubscriberAttributes,
    #[serde(default, deserialize_with = "null_as_default")]
    pub environment: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub app_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub aliases: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub transactions: Vec<RevenueCatTransaction>,
}

/// Event type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevenueCatEventKind {
    InitialPurchase,
    Renewal,
    Cancellation,
    Expiration,
    BillingIssue,
    ProductChange,
    NonRenewingPurchase,
    Transfer,
    VirtualCurrencyTransaction,
    Unknown,
}

impl RevenueCatEventKind {
    pub fn from_type(s: &str) -> Self {
        match s {
            "INITIAL_PURCHASE" => Self::InitialPurchase,
            "RENEWAL" => Self::Renewal,
            "CANCELLATION" => Self::Cancellation,
            "EXPIRATION" => Self::Expiration,
            "BILLING_ISSUE" => Self::BillingIssue,
            "PRODUCT_CHANGE" => Self::ProductChange,
            "NON_RENEWING_PURCHASE" => Self::NonRenewingPurchase,
            "TRANSFER" => Self::Transfer,
            "VIRTUAL_CURRENCY_TRANSACTION" => Self::VirtualCurrencyTransaction,
            _ => Self::Unknown,
        }
    }

    /// Kinds keyed off the first transaction's original transaction id.
    pub fn requires_transaction(&self) -> bool {
        matches!(
            self,
            Self::Renewal
                | Self::Cancellation
                | Self::Expiration
                | Self::BillingIssue
                | Self::ProductChange
                | Self::Transfer
        )
    }
}

/// Data needed to create a subscription from a purchase.
#[derive(Debug, Clone, PartialEq)]
pub struct Purchase {
    /// Original transaction id, or the app user id when there is none.
    pub subscription_id: String,
    pub app_user_id: String,
    /// Resolved owner; `None` when neither the app user id nor the
    /// `$userId` attribute holds a positive integer.
    pub user_id: Option<UserId>,
    pub product_id: Option<String>,
    /// Event expiration, falling back to the transaction's.
    pub expires_at: Option<Timestamp>,
    pub provider_data: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Renewal {
    /// Used to create the row when the lineage is unknown.
    pub purchase: Purchase,
    /// Transaction expiry only.
    pub expires_at: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductChange {
    pub subscription_id: String,
    pub product_id: Option<String>,
    pub expires_at: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    pub subscription_id: String,
    pub new_owner: Option<UserId>,
    pub app_user_id: String,
}

/// Closed set of RevenueCat events.
#[derive(Debug, Clone, PartialEq)]
pub enum RevenueCatEvent {
    InitialPurchase(Purchase),
    Renewal(Renewal),
    Cancellation { subscription_id: String },
    Expiration { subscription_id: String },
    BillingIssue { subscription_id: String },
    ProductChange(ProductChange),
    Transfer(Transfer),
    NonRenewingPurchase { app_user_id: String, product_id: String },
    VirtualCurrencyTransaction { app_user_id: String, product_id: String },
    /// A lineage-keyed kind that arrived with an empty transaction list.
    MissingTransaction { kind: RevenueCatEventKind },
    /// Unrecognised type; recorded and acknowledged only.
    Ignored { event_type: String },
}

impl RevenueCatNotification {
    pub fn kind(&self) -> RevenueCatEventKind {
        RevenueCatEventKind::from_type(&self.event_type)
    }

    /// Resolves the internal user: the app user id if it is a positive
    /// integer, else the `$userId` subscriber attribute under the same rule.
    pub fn resolve_user_id(&self) -> Option<UserId> {
        self.app_user_id.parse::<UserId>().ok().or_else(|| {
            self.subscriber_attributes
                .user_id
                .as_ref()
                .and_then(|attr| attr.value.parse::<UserId>().ok())
        })
    }

    pub fn first_transaction(&self) -> Option<&RevenueCatTransaction> {
        self.transactions.first()
    }

    fn original_transaction_id(&self) -> Option<&str> {
        self.first_transaction()
            .map(|t| t.original_transaction_id.as_str())
            .filter(|id| !id.is_empty())
    }

    fn transaction_expiry(&self) -> Option<Timestamp> {
        self.first_transaction()
            .and_then(|t| t.expires_date_ms)
            .and_then(Timestamp::from_unix_millis)
    }

    fn product_id(&self) -> Option<String> {
        Some(self.product_id.clone()).filter(|p| !p.is_empty())
    }

    fn provider_data(&self) -> serde_json::Value {
        let txn = self.first_transaction();
        serde_json::json!({
            "store": self.store,
            "environment": self.environment,
            "entitlement_ids": self.entitlement_ids,
            "period_type": txn.map(|t| t.period_type.as_str()),
            "is_trial_period": txn.map(|t| t.is_trial_period),
        })
    }

    fn purchase(&self) -> Purchase {
        let subscription_id = self
            .original_transaction_id()
            .unwrap_or(&self.app_user_id)
            .to_string();
        let expires_at = self
            .expiration_at_ms
            .and_then(Timestamp::from_unix_millis)
            .or_else(|| self.transaction_expiry());
        Purchase {
            subscription_id,
            app_user_id: self.app_user_id.clone(),
            user_id: self.resolve_user_id(),
            product_id: self.product_id(),
            expires_at,
            provider_data: self.provider_data(),
        }
    }

    /// Maps the wire payload onto the closed event set.
    pub fn classify(&self) -> RevenueCatEvent {
        let kind = self.kind();
        let lineage = match (kind.requires_transaction(), self.original_transaction_id()) {
            (true, None) => return RevenueCatEvent::MissingTransaction { kind },
            (_, id) => id.unwrap_or_default().to_string(),
        };

        match kind {
            RevenueCatEventKind::InitialPurchase => RevenueCatEvent::InitialPurchase(self.purchase()),
            RevenueCatEventKind::Renewal => RevenueCatEvent::Renewal(Renewal {
                purchase: self.purchase(),
                expires_at: self.transaction_expiry(),
            }),
            RevenueCatEventKind::Cancellation => RevenueCatEvent::Cancellation {
                subscription_id: lineage,
            },
            RevenueCatEventKind::Expiration => RevenueCatEvent::Expiration {
                subscription_id: lineage,
            },
            RevenueCatEventKind::BillingIssue => RevenueCatEvent::BillingIssue {
                subscription_id: lineage,
            },
            RevenueCatEventKind::ProductChange => RevenueCatEvent::ProductChange(ProductChange {
                subscription_id: lineage,
                product_id: self.product_id(),
                expires_at: self.transaction_expiry(),
            }),
            RevenueCatEventKind::Transfer => RevenueCatEvent::Transfer(Transfer {
                subscription_id: lineage,
                new_owner: self.resolve_user_id(),
                app_user_id: self.app_user_id.clone(),
            }),
            RevenueCatEventKind::NonRenewingPurchase => RevenueCatEvent::NonRenewingPurchase {
                app_user_id: self.app_user_id.clone(),
                product_id: self.product_id.clone(),
            },
            RevenueCatEventKind::VirtualCurrencyTransaction => {
                RevenueCatEvent::VirtualCurrencyTransaction {
                    app_user_id: self.app_user_id.clone(),
                    product_id: self.product_id.clone(),
                }
            }
            RevenueCatEventKind::Unknown => RevenueCatEvent::Ignored {
                event_type: self.event_type.clone(),
            },
        }
    }

    /// Ledger row for this event.
    pub fn to_processed(&self, processed_at: Timestamp) -> ProcessedEvent {
        ProcessedEvent {
            event_id: self.id.clone(),
            event_type: self.event_type.clone(),
            app_user_id: self.app_user_id.clone(),
            original_app_user_id: self.original_app_user_id.clone(),
            product_id: self.product_id.clone(),
            store: self.store.clone(),
            event_timestamp: Timestamp::from_unix_millis(self.event_timestamp_ms)
                .unwrap_or(processed_at),
            processed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn notification(value: serde_json::Value) -> RevenueCatNotification {
        serde_json::from_value(value).unwrap()
    }

    fn base(event_type: &str) -> serde_json::Value {
        json!({
            "id": "evt_1",
            "type": event_type,
            "event_timestamp_ms": 1705276800123_i64,
            "app_user_id": "7",
            "original_app_user_id": "7",
            "product_id": "premium_yearly",
            "store": "APP_STORE",
            "expiration_at_ms": 1736899200000_i64,
            "transactions": [{
                "id": "1000000001",
                "original_transaction_id": "orig_1",
                "product_id": "premium_yearly",
                "purchase_date_ms": 1705276800000_i64,
                "expires_date_ms": 1736899300000_i64,
                "period_type": "NORMAL"
            }]
        })
    }

    #[test]
    fn parses_full_webhook_body() {
        let body = json!({ "api_version": "1.0", "event": base("RENEWAL") });
        let webhook = RevenueCatWebhook::from_slice(body.to_string().as_bytes()).unwrap();
        assert_eq!(webhook.api_version, "1.0");
        assert_eq!(webhook.event.kind(), RevenueCatEventKind::Renewal);
    }

    #[test]
    fn tolerates_nulls_in_optional_fields() {
        let event = notification(json!({
            "id": "evt_2",
            "type": "TRANSFER",
            "app_user_id": null,
            "product_id": null,
            "entitlement_ids": null,
            "transactions": null,
            "subscriber_attributes": null
        }));
        assert!(event.transactions.is_empty());
        assert_eq!(event.app_user_id, "");
    }

    #[test]
    fn rejects_body_without_event_id() {
        let body = json!({ "event": { "type": "RENEWAL" } });
        assert!(RevenueCatWebhook::from_slice(body.to_string().as_bytes()).is_err());
    }

    #[test]
    fn resolves_numeric_app_user_id() {
        let event = notification(base("INITIAL_PURCHASE"));
        assert_eq!(event.resolve_user_id(), UserId::new(7).ok());
    }

    #[test]
    fn falls_back_to_subscriber_attribute() {
        let mut value = base("INITIAL_PURCHASE");
        value["app_user_id"] = json!("$RCAnonymousID:abc");
        value["subscriber_attributes"] = json!({
            "$userId": { "value": "42", "updated_at_ms": 1705276800000_i64 },
            "$email": { "value": "a@b.c" }
        });
        let event = notification(value);
        assert_eq!(event.resolve_user_id(), UserId::new(42).ok());
    }

    #[test]
    fn unresolvable_user_is_none() {
        let mut value = base("INITIAL_PURCHASE");
        value["app_user_id"] = json!("$RCAnonymousID:abc");
        value["subscriber_attributes"] = json!({ "$userId": { "value": "-1" } });
        assert_eq!(notification(value).resolve_user_id(), None);
    }

    #[test]
    fn initial_purchase_prefers_event_expiration() {
        let RevenueCatEvent::InitialPurchase(purchase) = notification(base("INITIAL_PURCHASE")).classify()
        else {
            panic!("expected initial purchase");
        };
        assert_eq!(purchase.subscription_id, "orig_1");
        assert_eq!(purchase.expires_at.unwrap().as_unix_secs(), 1736899200);
        assert_eq!(purchase.product_id.as_deref(), Some("premium_yearly"));
        assert_eq!(purchase.provider_data["store"], "APP_STORE");
    }

    #[test]
    fn initial_purchase_falls_back_to_transaction_expiry() {
        let mut value = base("INITIAL_PURCHASE");
        value["expiration_at_ms"] = json!(null);
        let RevenueCatEvent::InitialPurchase(purchase) = notification(value).classify() else {
            panic!("expected initial purchase");
        };
        assert_eq!(purchase.expires_at.unwrap().as_unix_secs(), 1736899300);
    }

    #[test]
    fn initial_purchase_without_transactions_uses_app_user_id() {
        let mut value = base("INITIAL_PURCHASE");
        value["transactions"] = json!([]);
        let RevenueCatEvent::InitialPurchase(purchase) = notification(value).classify() else {
            panic!("expected initial purchase");
        };
        assert_eq!(purchase.subscription_id, "7");
    }

    #[test]
    fn renewal_uses_transaction_expiry_only() {
        let RevenueCatEvent::Renewal(renewal) = notification(base("RENEWAL")).classify() else {
            panic!("expected renewal");
        };
        assert_eq!(renewal.expires_at.unwrap().as_unix_secs(), 1736899300);
        assert_eq!(renewal.purchase.subscription_id, "orig_1");
    }

    #[test]
    fn lineage_events_without_transactions_are_flagged() {
        for event_type in ["RENEWAL", "CANCELLATION", "EXPIRATION", "BILLING_ISSUE", "PRODUCT_CHANGE", "TRANSFER"] {
            let mut value = base(event_type);
            value["transactions"] = json!([]);
            assert!(
                matches!(notification(value).classify(), RevenueCatEvent::MissingTransaction { .. }),
                "{}",
                event_type
            );
        }
    }

    #[test]
    fn expiration_keys_off_original_transaction() {
        assert_eq!(
            notification(base("EXPIRATION")).classify(),
            RevenueCatEvent::Expiration {
                subscription_id: "orig_1".to_string()
            }
        );
    }

    #[test]
    fn unknown_type_is_ignored() {
        assert_eq!(
            notification(base("SUBSCRIPTION_PAUSED")).classify(),
            RevenueCatEvent::Ignored {
                event_type: "SUBSCRIPTION_PAUSED".to_string()
            }
        );
    }

    #[test]
    fn processed_event_truncates_timestamp_to_seconds() {
        let event = notification(base("EXPIRATION"));
        let now = Timestamp::now();
        let row = event.to_processed(now);
        assert_eq!(row.event_id, "evt_1");
        assert_eq!(row.event_timestamp.as_unix_secs(), 1705276800);
        assert_eq!(row.processed_at, now);
    }

    proptest! {
        #[test]
        fn positive_numeric_app_user_id_always_resolves(id in 1i64..i64::MAX) {
            let mut value = base("INITIAL_PURCHASE");
            value["app_user_id"] = json!(id.to_string());
            prop_assert_eq!(notification(value).resolve_user_id(), UserId::new(id).ok());
        }

        #[test]
        fn non_numeric_app_user_id_uses_attribute(
            anon in "[a-zA-Z$:_-][a-zA-Z0-9$:_-]{0,20}",
            id in 1i64..1_000_000,
        ) {
            let mut value = base("INITIAL_PURCHASE");
            value["app_user_id"] = json!(anon);
            value["subscriber_attributes"] = json!({ "$userId": { "value": id.to_string() } });
            prop_assert_eq!(notification(value).resolve_user_id(), UserId::new(id).ok());
        }
    }
}
