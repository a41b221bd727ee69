//! HandleStripeWebhookHandler - Reconciles Stripe checkout and invoice events.
//!
//! Stripe has no event ledger here: every branch is idempotent on natural
//! keys (subscription id, session id, invoice id), so a redelivered event
//! converges to the same rows.

use std::sync::Arc;

use crate::domain::billing::{
    checkout_expiry, invoice_expiry, CheckoutSession, Invoice, InvoiceRecord, MirrorSubscription,
    Provider, StripeEnvelope, StripeEvent, Subscription, SubscriptionStatus, SubscriptionUpdate,
    UpdateOutcome, WebhookError,
};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::{SaveResult, StripeLedger, SubscriptionStore};

/// Command carrying a Stripe event body whose origin has been validated.
#[derive(Debug, Clone)]
pub struct HandleStripeWebhookCommand {
    pub payload: Vec<u8>,
}

/// What a Stripe event did.
#[derive(Debug, Clone, PartialEq)]
pub enum StripeWebhookOutcome {
    /// Paid checkout for a known customer; unified row and mirror written.
    SubscriptionActivated {
        subscription_id: String,
        user_id: UserId,
        session_updated: bool,
    },

    /// Paid checkout for a customer with no local owner; only the mirror
    /// row was written.
    MirrorActivated {
        subscription_id: String,
        customer_id: String,
        session_updated: bool,
    },

    /// Session not yet paid or not complete. Nothing written.
    CheckoutNotConfirmed {
        session_id: String,
        payment_status: Option<String>,
        status: Option<String>,
    },

    /// Confirmed session that names no customer. Nothing written.
    CheckoutWithoutCustomer { session_id: String },

    InvoiceRecorded {
        invoice_id: String,
        subscription_id: String,
        /// False when the invoice had already been recorded.
        first_delivery: bool,
        update: UpdateOutcome,
    },

    /// One-off invoice not tied to a subscription.
    InvoiceWithoutSubscription { invoice_id: String },

    Ignored { event_type: String },
}

/// Handler for Stripe webhook events.
pub struct HandleStripeWebhookHandler {
    subscriptions: Arc<dyn SubscriptionStore>,
    ledger: Arc<dyn StripeLedger>,
}

impl HandleStripeWebhookHandler {
    pub fn new(subscriptions: Arc<dyn SubscriptionStore>, ledger: Arc<dyn StripeLedger>) -> Self {
        Self {
            subscriptions,
            ledger,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandleStripeWebhookCommand,
    ) -> Result<StripeWebhookOutcome, WebhookError> {
        let envelope = StripeEnvelope::from_slice(&cmd.payload).map_err(WebhookError::malformed)?;
        let event = StripeEvent::from_envelope(&envelope).map_err(WebhookError::malformed)?;

        match event {
            StripeEvent::CheckoutSessionCompleted(session) => {
                self.handle_checkout_completed(session).await
            }
            StripeEvent::InvoicePaymentSucceeded(invoice) => {
                self.handle_invoice_paid(invoice).await
            }
            StripeEvent::Ignored { event_type } => Ok(StripeWebhookOutcome::Ignored { event_type }),
        }
    }

    async fn handle_checkout_completed(
        &self,
        session: CheckoutSession,
    ) -> Result<StripeWebhookOutcome, WebhookError> {
        let Some(subscription_id) = session.confirmed_subscription_id() else {
            return Ok(StripeWebhookOutcome::CheckoutNotConfirmed {
                session_id: session.id,
                payment_status: session.payment_status,
                status: session.status,
            });
        };
        let Some(customer_id) = session.customer_id() else {
            return Ok(StripeWebhookOutcome::CheckoutWithoutCustomer {
                session_id: session.id,
            });
        };

        let now = Timestamp::now();
        let expires_at = checkout_expiry(now);
        let customer = self.ledger.find_customer(customer_id).await?;

        let owner = match customer {
            Some(customer) => {
                let subscription =
                    Subscription::activate(subscription_id, customer.user_id, Provider::Stripe, customer_id, now)
                        .map_err(WebhookError::malformed)?
                        .with_circle(customer.circle_id)
                        .with_expiry(Some(expires_at));
                self.subscriptions.upsert(&subscription).await?;
                Some(customer.user_id)
            }
            None => {
                self.subscriptions
                    .upsert_mirror(&MirrorSubscription {
                        subscription_id: subscription_id.to_string(),
                        customer_id: customer_id.to_string(),
                        status: SubscriptionStatus::Active,
                        expired_at: Some(expires_at),
                        updated_at: now,
                    })
                    .await?;
                None
            }
        };

        let session_status = session.status.as_deref().unwrap_or("complete");
        let session_updated = self
            .ledger
            .update_session_status(&session.id, session_status)
            .await?;

        Ok(match owner {
            Some(user_id) => StripeWebhookOutcome::SubscriptionActivated {
                subscription_id: subscription_id.to_string(),
                user_id,
                session_updated,
            },
            None => StripeWebhookOutcome::MirrorActivated {
                subscription_id: subscription_id.to_string(),
                customer_id: customer_id.to_string(),
                session_updated,
            },
        })
    }

    async fn handle_invoice_paid(
        &self,
        invoice: Invoice,
    ) -> Result<StripeWebhookOutcome, WebhookError> {
        let Some(subscription_id) = invoice.subscription_id().map(str::to_string) else {
            return Ok(StripeWebhookOutcome::InvoiceWithoutSubscription {
                invoice_id: invoice.id,
            });
        };
        let (Some(period_start), Some(period_end)) = (invoice.period_start(), invoice.period_end())
        else {
            return Err(WebhookError::malformed("invoice period out of range"));
        };

        let record = InvoiceRecord {
            invoice_id: invoice.id.clone(),
            amount: invoice.amount_paid,
            currency: invoice.currency.clone(),
            status: "paid".to_string(),
            subscription_id: subscription_id.clone(),
            customer_id: invoice.customer_id().unwrap_or_default().to_string(),
            period_start,
            period_end,
            received_at: Timestamp::now(),
        };
        let saved = self.ledger.record_invoice(&record).await?;

        let update = SubscriptionUpdate::status(SubscriptionStatus::Active)
            .with_expiry(Some(invoice_expiry(period_end)));
        let update = self
            .subscriptions
            .apply(Provider::Stripe, &subscription_id, &update)
            .await?;

        Ok(StripeWebhookOutcome::InvoiceRecorded {
            invoice_id: invoice.id,
            subscription_id,
            first_delivery: saved == SaveResult::Inserted,
            update,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryStripeLedger, InMemorySubscriptionStore};
    use crate::domain::billing::StripeCustomer;
    use serde_json::json;

    struct Fixture {
        store: Arc<InMemorySubscriptionStore>,
        ledger: Arc<InMemoryStripeLedger>,
        handler: HandleStripeWebhookHandler,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemorySubscriptionStore::new());
        let ledger = Arc::new(InMemoryStripeLedger::new());
        let handler = HandleStripeWebhookHandler::new(store.clone(), ledger.clone());
        Fixture {
            store,
            ledger,
            handler,
        }
    }

    fn command(event_type: &str, object: serde_json::Value) -> HandleStripeWebhookCommand {
        let body = json!({
            "id": "evt_1",
            "type": event_type,
            "created": 1_700_000_000,
            "data": { "object": object },
            "livemode": false
        });
        HandleStripeWebhookCommand {
            payload: serde_json::to_vec(&body).unwrap(),
        }
    }

    fn session(payment_status: &str, status: &str) -> serde_json::Value {
        json!({
            "id": "cs_1",
            "customer": "cus_1",
            "subscription": "sub_1",
            "payment_status": payment_status,
            "status": status
        })
    }

    async fn known_customer(ledger: &InMemoryStripeLedger) {
        ledger
            .save_customer(&StripeCustomer {
                customer_id: "cus_1".to_string(),
                user_id: UserId::new(7).unwrap(),
                circle_id: None,
                created_at: Timestamp::now(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unpaid_checkout_writes_nothing() {
        let f = fixture();
        let outcome = f
            .handler
            .handle(command("checkout.session.completed", session("unpaid", "complete")))
            .await
            .unwrap();

        assert!(matches!(outcome, StripeWebhookOutcome::CheckoutNotConfirmed { .. }));
        assert!(f.store.all().await.is_empty());
        assert_eq!(f.store.mirror_count().await, 0);
    }

    #[tokio::test]
    async fn open_checkout_writes_nothing() {
        let f = fixture();
        let outcome = f
            .handler
            .handle(command("checkout.session.completed", session("paid", "open")))
            .await
            .unwrap();

        assert!(matches!(outcome, StripeWebhookOutcome::CheckoutNotConfirmed { .. }));
        assert!(f.store.all().await.is_empty());
    }

    #[tokio::test]
    async fn paid_checkout_activates_known_customer() {
        let f = fixture();
        known_customer(&f.ledger).await;

        let outcome = f
            .handler
            .handle(command("checkout.session.completed", session("paid", "complete")))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            StripeWebhookOutcome::SubscriptionActivated {
                subscription_id: "sub_1".to_string(),
                user_id: UserId::new(7).unwrap(),
                session_updated: false,
            }
        );
        let sub = f.store.find_by_id("sub_1").await.unwrap().unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.provider, Provider::Stripe);
        assert!(sub.expires_at.is_some());
        let mirror = f.store.find_mirror("sub_1").await.unwrap().unwrap();
        assert_eq!(mirror.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn paid_checkout_for_unknown_customer_writes_mirror_only() {
        let f = fixture();
        let outcome = f
            .handler
            .handle(command("checkout.session.completed", session("paid", "complete")))
            .await
            .unwrap();

        assert!(matches!(outcome, StripeWebhookOutcome::MirrorActivated { .. }));
        assert!(f.store.all().await.is_empty());
        assert!(f.store.find_mirror("sub_1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn expanded_references_are_accepted() {
        let f = fixture();
        known_customer(&f.ledger).await;
        let object = json!({
            "id": "cs_1",
            "customer": { "id": "cus_1", "object": "customer" },
            "subscription": { "id": "sub_1", "object": "subscription" },
            "payment_status": "paid",
            "status": "complete"
        });

        f.handler
            .handle(command("checkout.session.completed", object))
            .await
            .unwrap();

        assert!(f.store.find_by_id("sub_1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn invoice_extends_expiry_and_is_recorded_once() {
        let f = fixture();
        known_customer(&f.ledger).await;
        f.handler
            .handle(command("checkout.session.completed", session("paid", "complete")))
            .await
            .unwrap();

        let invoice = json!({
            "id": "in_1",
            "customer": "cus_1",
            "subscription": "sub_1",
            "amount_paid": 4999,
            "currency": "usd",
            "period_start": 1_700_000_000,
            "period_end": 1_731_536_000
        });
        let first = f
            .handler
            .handle(command("invoice.payment_succeeded", invoice.clone()))
            .await
            .unwrap();
        let second = f
            .handler
            .handle(command("invoice.payment_succeeded", invoice))
            .await
            .unwrap();

        assert!(matches!(
            first,
            StripeWebhookOutcome::InvoiceRecorded { first_delivery: true, .. }
        ));
        assert!(matches!(
            second,
            StripeWebhookOutcome::InvoiceRecorded { first_delivery: false, .. }
        ));
        assert_eq!(f.ledger.invoice_count().await, 1);

        let expected = invoice_expiry(Timestamp::from_unix_secs(1_731_536_000).unwrap());
        let sub = f.store.find_by_id("sub_1").await.unwrap().unwrap();
        assert_eq!(sub.expires_at, Some(expected));
        let mirror = f.store.find_mirror("sub_1").await.unwrap().unwrap();
        assert_eq!(mirror.expired_at, Some(expected));
    }

    #[tokio::test]
    async fn invoice_without_subscription_is_benign() {
        let f = fixture();
        let invoice = json!({
            "id": "in_2",
            "customer": "cus_1",
            "amount_paid": 100,
            "period_start": 1_700_000_000,
            "period_end": 1_700_000_000
        });

        let outcome = f
            .handler
            .handle(command("invoice.payment_succeeded", invoice))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            StripeWebhookOutcome::InvoiceWithoutSubscription {
                invoice_id: "in_2".to_string()
            }
        );
        assert_eq!(f.ledger.invoice_count().await, 0);
    }

    #[tokio::test]
    async fn unknown_types_are_ignored() {
        let f = fixture();
        let outcome = f
            .handler
            .handle(command("customer.created", json!({"id": "cus_9"})))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            StripeWebhookOutcome::Ignored {
                event_type: "customer.created".to_string()
            }
        );
    }

    #[tokio::test]
    async fn undecodable_body_is_malformed() {
        let f = fixture();
        let err = f
            .handler
            .handle(HandleStripeWebhookCommand {
                payload: b"not json".to_vec(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, WebhookError::MalformedPayload(_)));
        assert!(err.triggers_redelivery(Provider::Stripe));
    }

    #[tokio::test]
    async fn storage_failure_is_surfaced() {
        let f = fixture();
        f.ledger.fail_with("connection refused").await;

        let err = f
            .handler
            .handle(command("checkout.session.completed", session("paid", "complete")))
            .await
            .unwrap_err();

        assert!(matches!(err, WebhookError::Storage(_)));
    }
}
