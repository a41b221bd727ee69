//! HandleRevenueCatWebhookHandler - Reconciles RevenueCat store events.
//!
//! Every delivered event id is recorded in the event ledger exactly once.
//! Events that change a subscription are recorded in the same store
//! transaction as the change, so a delivery abandoned mid-write leaves no
//! trace and is processed again on redelivery. Events that change nothing
//! are recorded directly. When a change fails, the event is still recorded
//! and the sender receives a success: the failure is logged, not retried.

use std::sync::Arc;

use crate::domain::billing::{
    ProcessedEvent, Provider, Purchase, RevenueCatEvent, RevenueCatEventKind, RevenueCatWebhook,
    Subscription, SubscriptionStatus, SubscriptionUpdate, UpdateOutcome, WebhookError,
};
use crate::domain::foundation::{DomainError, Timestamp, UserId};
use crate::ports::{Claim, EventLedger, SaveResult, SubscriptionStore, UserDirectory};

/// Command carrying an authenticated RevenueCat webhook body.
#[derive(Debug, Clone)]
pub struct HandleRevenueCatWebhookCommand {
    pub payload: Vec<u8>,
}

/// State change caused by a dispatched event.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// A new unified subscription row was written.
    Created {
        subscription_id: String,
        user_id: UserId,
    },

    /// A targeted update ran against an existing lineage.
    Updated {
        subscription_id: String,
        outcome: UpdateOutcome,
    },

    /// The event needed an internal user and none could be resolved.
    UnresolvedUser { app_user_id: String },

    /// The event resolved to a user id the directory does not know.
    UnknownUser { user_id: UserId },

    /// Lineage-keyed event without any transaction to key on.
    MissingTransaction { kind: RevenueCatEventKind },

    /// Acknowledged without touching subscription state.
    NoStateChange { event_type: String },
}

/// Result of handling a RevenueCat webhook.
#[derive(Debug, Clone, PartialEq)]
pub enum RevenueCatWebhookOutcome {
    /// Event id already in the ledger. No side effects.
    AlreadyProcessed { event_id: String },

    Processed {
        event_id: String,
        reconciliation: Reconciliation,
    },

    /// The state change failed and was rolled back. The event id was
    /// recorded afterwards, so redelivery will not retry it.
    DispatchFailed { event_id: String, error: String },
}

/// Handler for RevenueCat webhook events.
pub struct HandleRevenueCatWebhookHandler {
    subscriptions: Arc<dyn SubscriptionStore>,
    events: Arc<dyn EventLedger>,
    users: Arc<dyn UserDirectory>,
}

impl HandleRevenueCatWebhookHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionStore>,
        events: Arc<dyn EventLedger>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            subscriptions,
            events,
            users,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandleRevenueCatWebhookCommand,
    ) -> Result<RevenueCatWebhookOutcome, WebhookError> {
        let webhook = RevenueCatWebhook::from_slice(&cmd.payload).map_err(WebhookError::malformed)?;
        let notification = webhook.event;
        if notification.id.trim().is_empty() {
            return Err(WebhookError::malformed("event id is empty"));
        }
        let event_id = notification.id.clone();

        if self.events.exists(&event_id).await? {
            return Ok(RevenueCatWebhookOutcome::AlreadyProcessed { event_id });
        }

        let processed = notification.to_processed(Timestamp::now());
        Ok(match self.dispatch(&processed, notification.classify()).await {
            Ok(Claim::Won(reconciliation)) => RevenueCatWebhookOutcome::Processed {
                event_id,
                reconciliation,
            },
            Ok(Claim::AlreadyClaimed) => RevenueCatWebhookOutcome::AlreadyProcessed { event_id },
            Err(err) => match self.events.record(&processed).await? {
                SaveResult::Inserted => RevenueCatWebhookOutcome::DispatchFailed {
                    event_id,
                    error: err.to_string(),
                },
                SaveResult::AlreadyExists => {
                    RevenueCatWebhookOutcome::AlreadyProcessed { event_id }
                }
            },
        })
    }

    /// Apply one event. Every `Ok` path has recorded `processed`.
    async fn dispatch(
        &self,
        processed: &ProcessedEvent,
        event: RevenueCatEvent,
    ) -> Result<Claim<Reconciliation>, DomainError> {
        match event {
            RevenueCatEvent::InitialPurchase(purchase) => {
                self.create_from_purchase(processed, purchase).await
            }
            RevenueCatEvent::Renewal(renewal) => {
                let id = renewal.purchase.subscription_id.clone();
                if self.subscriptions.find_by_id(&id).await?.is_none() {
                    return self.create_from_purchase(processed, renewal.purchase).await;
                }
                let update = SubscriptionUpdate::status(SubscriptionStatus::Active)
                    .with_expiry(renewal.expires_at);
                self.update(processed, id, update).await
            }
            RevenueCatEvent::Cancellation { subscription_id } => {
                self.update(
                    processed,
                    subscription_id,
                    SubscriptionUpdate::status(SubscriptionStatus::Cancelled),
                )
                .await
            }
            RevenueCatEvent::Expiration { subscription_id } => {
                self.update(
                    processed,
                    subscription_id,
                    SubscriptionUpdate::status(SubscriptionStatus::Expired),
                )
                .await
            }
            RevenueCatEvent::BillingIssue { subscription_id } => {
                self.update(
                    processed,
                    subscription_id,
                    SubscriptionUpdate::status(SubscriptionStatus::BillingIssue),
                )
                .await
            }
            RevenueCatEvent::ProductChange(change) => {
                let mut update = SubscriptionUpdate::default().with_expiry(change.expires_at);
                if let Some(product_id) = change.product_id {
                    update = update.with_product(product_id);
                }
                if update.is_empty() {
                    return self
                        .record_only(
                            processed,
                            Reconciliation::NoStateChange {
                                event_type: "PRODUCT_CHANGE".to_string(),
                            },
                        )
                        .await;
                }
                self.update(processed, change.subscription_id, update).await
            }
            RevenueCatEvent::Transfer(transfer) => match transfer.new_owner {
                Some(user_id) => {
                    let update =
                        SubscriptionUpdate::default().transfer_to(user_id, transfer.app_user_id);
                    self.update(processed, transfer.subscription_id, update).await
                }
                None => {
                    self.record_only(
                        processed,
                        Reconciliation::UnresolvedUser {
                            app_user_id: transfer.app_user_id,
                        },
                    )
                    .await
                }
            },
            RevenueCatEvent::NonRenewingPurchase { .. } => {
                self.record_only(
                    processed,
                    Reconciliation::NoStateChange {
                        event_type: "NON_RENEWING_PURCHASE".to_string(),
                    },
                )
                .await
            }
            RevenueCatEvent::VirtualCurrencyTransaction { .. } => {
                self.record_only(
                    processed,
                    Reconciliation::NoStateChange {
                        event_type: "VIRTUAL_CURRENCY_TRANSACTION".to_string(),
                    },
                )
                .await
            }
            RevenueCatEvent::MissingTransaction { kind } => {
                self.record_only(processed, Reconciliation::MissingTransaction { kind })
                    .await
            }
            RevenueCatEvent::Ignored { event_type } => {
                self.record_only(processed, Reconciliation::NoStateChange { event_type })
                    .await
            }
        }
    }

    async fn create_from_purchase(
        &self,
        processed: &ProcessedEvent,
        purchase: Purchase,
    ) -> Result<Claim<Reconciliation>, DomainError> {
        let Some(user_id) = purchase.user_id else {
            return self
                .record_only(
                    processed,
                    Reconciliation::UnresolvedUser {
                        app_user_id: purchase.app_user_id,
                    },
                )
                .await;
        };
        let Some(profile) = self.users.find_by_id(user_id).await? else {
            return self
                .record_only(processed, Reconciliation::UnknownUser { user_id })
                .await;
        };

        let subscription = Subscription::activate(
            purchase.subscription_id,
            user_id,
            Provider::RevenueCat,
            purchase.app_user_id,
            Timestamp::now(),
        )?
        .with_circle(profile.circle_id)
        .with_product(purchase.product_id)
        .with_expiry(purchase.expires_at)
        .with_provider_data(purchase.provider_data);

        Ok(
            match self.subscriptions.claim_and_upsert(processed, &subscription).await? {
                Claim::Won(()) => Claim::Won(Reconciliation::Created {
                    subscription_id: subscription.id,
                    user_id,
                }),
                Claim::AlreadyClaimed => Claim::AlreadyClaimed,
            },
        )
    }

    async fn update(
        &self,
        processed: &ProcessedEvent,
        subscription_id: String,
        update: SubscriptionUpdate,
    ) -> Result<Claim<Reconciliation>, DomainError> {
        let claim = self
            .subscriptions
            .claim_and_apply(processed, Provider::RevenueCat, &subscription_id, &update)
            .await?;
        Ok(match claim {
            Claim::Won(outcome) => Claim::Won(Reconciliation::Updated {
                subscription_id,
                outcome,
            }),
            Claim::AlreadyClaimed => Claim::AlreadyClaimed,
        })
    }

    async fn record_only(
        &self,
        processed: &ProcessedEvent,
        reconciliation: Reconciliation,
    ) -> Result<Claim<Reconciliation>, DomainError> {
        Ok(match self.events.record(processed).await? {
            SaveResult::Inserted => Claim::Won(reconciliation),
            SaveResult::AlreadyExists => Claim::AlreadyClaimed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryEventLedger, InMemorySubscriptionStore, InMemoryUserDirectory,
    };
    use crate::domain::billing::MirrorSubscription;
    use crate::domain::foundation::CircleId;
    use crate::ports::UserProfile;
    use serde_json::json;
    use std::time::Duration;

    struct Fixture {
        store: Arc<InMemorySubscriptionStore>,
        events: Arc<InMemoryEventLedger>,
        users: Arc<InMemoryUserDirectory>,
        handler: HandleRevenueCatWebhookHandler,
    }

    fn profile(id: i64, circle: Option<i64>) -> UserProfile {
        UserProfile {
            id: UserId::new(id).unwrap(),
            display_name: None,
            email: None,
            circle_id: circle.map(CircleId::new),
        }
    }

    async fn fixture() -> Fixture {
        let events = Arc::new(InMemoryEventLedger::new());
        let store = Arc::new(InMemorySubscriptionStore::with_event_ledger(events.clone()));
        let users = Arc::new(InMemoryUserDirectory::new());
        users.insert(profile(7, Some(3))).await;
        users.insert(profile(9, None)).await;
        let handler =
            HandleRevenueCatWebhookHandler::new(store.clone(), events.clone(), users.clone());
        Fixture {
            store,
            events,
            users,
            handler,
        }
    }

    fn event(id: &str, event_type: &str, app_user_id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "type": event_type,
            "event_timestamp_ms": 1705276800123_i64,
            "app_user_id": app_user_id,
            "original_app_user_id": app_user_id,
            "product_id": "premium_yearly",
            "store": "APP_STORE",
            "environment": "PRODUCTION",
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

    fn command(event: serde_json::Value) -> HandleRevenueCatWebhookCommand {
        HandleRevenueCatWebhookCommand {
            payload: serde_json::to_vec(&json!({ "api_version": "1.0", "event": event })).unwrap(),
        }
    }

    async fn purchase(f: &Fixture) {
        f.handler
            .handle(command(event("evt_purchase", "INITIAL_PURCHASE", "7")))
            .await
            .unwrap();
    }

    // ═══════════════════════════════════════════════════════════════════
    // Idempotency
    // ═══════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn initial_purchase_creates_subscription_and_claims_event() {
        let f = fixture().await;
        let outcome = f
            .handler
            .handle(command(event("evt_1", "INITIAL_PURCHASE", "7")))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            RevenueCatWebhookOutcome::Processed {
                event_id: "evt_1".to_string(),
                reconciliation: Reconciliation::Created {
                    subscription_id: "orig_1".to_string(),
                    user_id: UserId::new(7).unwrap(),
                },
            }
        );
        let sub = f.store.find_by_id("orig_1").await.unwrap().unwrap();
        assert_eq!(sub.provider, Provider::RevenueCat);
        assert_eq!(sub.product_id.as_deref(), Some("premium_yearly"));
        assert_eq!(sub.external_customer_id, "7");
        assert_eq!(sub.expires_at, Timestamp::from_unix_millis(1736899200000));
        assert!(f.events.get("evt_1").await.is_some());
        assert_eq!(f.store.mirror_count().await, 0);
    }

    #[tokio::test]
    async fn redelivered_event_has_no_side_effects() {
        let f = fixture().await;
        purchase(&f).await;
        f.handler
            .handle(command(event("evt_cancel", "CANCELLATION", "7")))
            .await
            .unwrap();

        let again = f
            .handler
            .handle(command(event("evt_purchase", "INITIAL_PURCHASE", "7")))
            .await
            .unwrap();

        assert_eq!(
            again,
            RevenueCatWebhookOutcome::AlreadyProcessed {
                event_id: "evt_purchase".to_string()
            }
        );
        let sub = f.store.find_by_id("orig_1").await.unwrap().unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Cancelled);
        assert_eq!(f.events.len().await, 2);
    }

    #[tokio::test]
    async fn empty_event_id_is_malformed() {
        let f = fixture().await;
        let err = f
            .handler
            .handle(command(event("  ", "RENEWAL", "7")))
            .await
            .unwrap_err();

        assert!(matches!(err, WebhookError::MalformedPayload(_)));
        assert!(f.events.is_empty().await);
    }

    #[tokio::test]
    async fn ledger_failure_is_storage_error() {
        let f = fixture().await;
        f.events.fail_with("connection reset").await;

        let err = f
            .handler
            .handle(command(event("evt_1", "INITIAL_PURCHASE", "7")))
            .await
            .unwrap_err();

        assert!(matches!(err, WebhookError::Storage(_)));
        assert!(f.store.all().await.is_empty());
    }

    #[tokio::test]
    async fn dispatch_failure_after_claim_is_reported() {
        let f = fixture().await;
        f.store.fail_with("disk full").await;

        let outcome = f
            .handler
            .handle(command(event("evt_1", "INITIAL_PURCHASE", "7")))
            .await
            .unwrap();

        assert!(matches!(outcome, RevenueCatWebhookOutcome::DispatchFailed { .. }));
        assert!(f.events.get("evt_1").await.is_some());
        f.store.recover().await;
        assert!(f.store.all().await.is_empty());
    }

    /// Sleeps before every claiming write, then delegates.
    struct SlowClaims {
        inner: Arc<InMemorySubscriptionStore>,
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl SubscriptionStore for SlowClaims {
        async fn upsert(&self, subscription: &Subscription) -> Result<(), DomainError> {
            self.inner.upsert(subscription).await
        }

        async fn upsert_mirror(&self, mirror: &MirrorSubscription) -> Result<(), DomainError> {
            self.inner.upsert_mirror(mirror).await
        }

        async fn find_by_id(&self, id: &str) -> Result<Option<Subscription>, DomainError> {
            self.inner.find_by_id(id).await
        }

        async fn find_active_for_user(
            &self,
            user_id: UserId,
        ) -> Result<Option<Subscription>, DomainError> {
            self.inner.find_active_for_user(user_id).await
        }

        async fn apply(
            &self,
            provider: Provider,
            id: &str,
            update: &SubscriptionUpdate,
        ) -> Result<UpdateOutcome, DomainError> {
            self.inner.apply(provider, id, update).await
        }

        async fn claim_and_upsert(
            &self,
            event: &ProcessedEvent,
            subscription: &Subscription,
        ) -> Result<Claim<()>, DomainError> {
            tokio::time::sleep(self.delay).await;
            self.inner.claim_and_upsert(event, subscription).await
        }

        async fn claim_and_apply(
            &self,
            event: &ProcessedEvent,
            provider: Provider,
            id: &str,
            update: &SubscriptionUpdate,
        ) -> Result<Claim<UpdateOutcome>, DomainError> {
            tokio::time::sleep(self.delay).await;
            self.inner.claim_and_apply(event, provider, id, update).await
        }

        async fn find_mirror(&self, id: &str) -> Result<Option<MirrorSubscription>, DomainError> {
            self.inner.find_mirror(id).await
        }
    }

    #[tokio::test]
    async fn abandoned_delivery_is_processed_on_redelivery() {
        let f = fixture().await;
        let slow = HandleRevenueCatWebhookHandler::new(
            Arc::new(SlowClaims {
                inner: f.store.clone(),
                delay: Duration::from_millis(200),
            }),
            f.events.clone(),
            f.users.clone(),
        );

        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            slow.handle(command(event("evt_1", "INITIAL_PURCHASE", "7"))),
        )
        .await;
        assert!(abandoned.is_err());
        assert!(f.events.is_empty().await);
        assert!(f.store.all().await.is_empty());

        let outcome = f
            .handler
            .handle(command(event("evt_1", "INITIAL_PURCHASE", "7")))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            RevenueCatWebhookOutcome::Processed {
                reconciliation: Reconciliation::Created { .. },
                ..
            }
        ));
        assert!(f.events.get("evt_1").await.is_some());
        assert_eq!(f.store.all().await.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_deliveries_of_one_event_apply_once() {
        let f = fixture().await;
        let slow = HandleRevenueCatWebhookHandler::new(
            Arc::new(SlowClaims {
                inner: f.store.clone(),
                delay: Duration::from_millis(20),
            }),
            f.events.clone(),
            f.users.clone(),
        );

        let (first, second) = tokio::join!(
            slow.handle(command(event("evt_1", "INITIAL_PURCHASE", "7"))),
            slow.handle(command(event("evt_1", "INITIAL_PURCHASE", "7"))),
        );

        let outcomes = [first.unwrap(), second.unwrap()];
        let processed = outcomes
            .iter()
            .filter(|o| matches!(o, RevenueCatWebhookOutcome::Processed { .. }))
            .count();
        let duplicates = outcomes
            .iter()
            .filter(|o| matches!(o, RevenueCatWebhookOutcome::AlreadyProcessed { .. }))
            .count();
        assert_eq!((processed, duplicates), (1, 1));
        assert_eq!(f.events.len().await, 1);
        assert_eq!(f.store.all().await.len(), 1);
    }

    // ═══════════════════════════════════════════════════════════════════
    // Lifecycle
    // ═══════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn purchase_copies_circle_from_user_directory() {
        let f = fixture().await;
        purchase(&f).await;

        let sub = f.store.find_by_id("orig_1").await.unwrap().unwrap();
        assert_eq!(sub.circle_id, Some(CircleId::new(3)));
    }

    #[tokio::test]
    async fn purchase_for_unknown_user_creates_no_row() {
        let f = fixture().await;
        let outcome = f
            .handler
            .handle(command(event("evt_1", "INITIAL_PURCHASE", "404")))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            RevenueCatWebhookOutcome::Processed {
                event_id: "evt_1".to_string(),
                reconciliation: Reconciliation::UnknownUser {
                    user_id: UserId::new(404).unwrap()
                },
            }
        );
        assert!(f.store.all().await.is_empty());
        assert!(f.events.get("evt_1").await.is_some());
    }

    #[tokio::test]
    async fn directory_failure_records_event_and_reports() {
        let f = fixture().await;
        f.users.fail_with("directory unavailable").await;

        let outcome = f
            .handler
            .handle(command(event("evt_1", "INITIAL_PURCHASE", "7")))
            .await
            .unwrap();

        assert!(matches!(outcome, RevenueCatWebhookOutcome::DispatchFailed { .. }));
        assert!(f.events.get("evt_1").await.is_some());
        assert!(f.store.all().await.is_empty());
    }

    #[tokio::test]
    async fn anonymous_purchase_without_attribute_is_unresolved() {
        let f = fixture().await;
        let outcome = f
            .handler
            .handle(command(event("evt_1", "INITIAL_PURCHASE", "$RCAnonymousID:abc")))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            RevenueCatWebhookOutcome::Processed {
                reconciliation: Reconciliation::UnresolvedUser { .. },
                ..
            }
        ));
        assert!(f.store.all().await.is_empty());
        assert!(f.events.get("evt_1").await.is_some());
    }

    #[tokio::test]
    async fn renewal_without_row_creates_one() {
        let f = fixture().await;
        let outcome = f
            .handler
            .handle(command(event("evt_1", "RENEWAL", "7")))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            RevenueCatWebhookOutcome::Processed {
                reconciliation: Reconciliation::Created { .. },
                ..
            }
        ));
        assert!(f.store.find_by_id("orig_1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn renewal_reactivates_and_extends() {
        let f = fixture().await;
        purchase(&f).await;
        f.handler
            .handle(command(event("evt_exp", "EXPIRATION", "7")))
            .await
            .unwrap();

        f.handler
            .handle(command(event("evt_renew", "RENEWAL", "7")))
            .await
            .unwrap();

        let sub = f.store.find_by_id("orig_1").await.unwrap().unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.expires_at, Timestamp::from_unix_millis(1736899300000));
    }

    #[tokio::test]
    async fn billing_issue_after_cancellation_is_skipped() {
        let f = fixture().await;
        purchase(&f).await;
        f.handler
            .handle(command(event("evt_cancel", "CANCELLATION", "7")))
            .await
            .unwrap();

        let outcome = f
            .handler
            .handle(command(event("evt_issue", "BILLING_ISSUE", "7")))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            RevenueCatWebhookOutcome::Processed {
                reconciliation: Reconciliation::Updated {
                    outcome: UpdateOutcome::Skipped { .. },
                    ..
                },
                ..
            }
        ));
        let sub = f.store.find_by_id("orig_1").await.unwrap().unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Cancelled);
    }

    #[tokio::test]
    async fn product_change_keeps_status() {
        let f = fixture().await;
        purchase(&f).await;
        let mut change = event("evt_change", "PRODUCT_CHANGE", "7");
        change["product_id"] = json!("premium_monthly");

        f.handler.handle(command(change)).await.unwrap();

        let sub = f.store.find_by_id("orig_1").await.unwrap().unwrap();
        assert_eq!(sub.product_id.as_deref(), Some("premium_monthly"));
        assert_eq!(sub.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn transfer_moves_ownership() {
        let f = fixture().await;
        purchase(&f).await;

        f.handler
            .handle(command(event("evt_transfer", "TRANSFER", "9")))
            .await
            .unwrap();

        let sub = f.store.find_by_id("orig_1").await.unwrap().unwrap();
        assert_eq!(sub.user_id, UserId::new(9).unwrap());
        assert_eq!(sub.external_customer_id, "9");
    }

    #[tokio::test]
    async fn cancellation_without_transactions_is_claimed_only() {
        let f = fixture().await;
        let mut value = event("evt_1", "CANCELLATION", "7");
        value["transactions"] = json!([]);

        let outcome = f.handler.handle(command(value)).await.unwrap();

        assert!(matches!(
            outcome,
            RevenueCatWebhookOutcome::Processed {
                reconciliation: Reconciliation::MissingTransaction {
                    kind: RevenueCatEventKind::Cancellation
                },
                ..
            }
        ));
        assert!(f.events.get("evt_1").await.is_some());
    }

    #[tokio::test]
    async fn unknown_type_is_recorded_and_ignored() {
        let f = fixture().await;
        let outcome = f
            .handler
            .handle(command(event("evt_1", "SUBSCRIPTION_PAUSED", "7")))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            RevenueCatWebhookOutcome::Processed {
                event_id: "evt_1".to_string(),
                reconciliation: Reconciliation::NoStateChange {
                    event_type: "SUBSCRIPTION_PAUSED".to_string()
                },
            }
        );
        assert!(f.events.get("evt_1").await.is_some());
    }
}
