//! PostgreSQL implementation of SubscriptionStore.
//!
//! Stripe-owned rows are paired with a row in `stripe_subscriptions`; both
//! are written inside the same transaction. Claiming writes add the
//! `revenuecat_events` insert to that transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::domain::billing::{
    MirrorSubscription, ProcessedEvent, Provider, Subscription, SubscriptionStatus,
    SubscriptionUpdate, UpdateOutcome,
};
use crate::domain::foundation::{CircleId, DomainError, ErrorCode, Timestamp, UserId};
use crate::ports::{Claim, SubscriptionStore};

use super::event_ledger::insert_event;

const SELECT_COLUMNS: &str = r#"
    SELECT id, user_id, circle_id, provider, external_subscription_id, external_customer_id,
           product_id, status, expires_at, created_at, updated_at, provider_data
    FROM subscriptions
"#;

/// PostgreSQL implementation of the SubscriptionStore port.
pub struct PostgresSubscriptionStore {
    pool: PgPool,
}

impl PostgresSubscriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: String,
    user_id: i64,
    circle_id: Option<i64>,
    provider: String,
    external_subscription_id: String,
    external_customer_id: String,
    product_id: Option<String>,
    status: String,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    provider_data: Option<serde_json::Value>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let corrupt = |e: crate::domain::foundation::ValidationError| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid subscription row: {}", e))
                .with_detail("subscription_id", row.id.clone())
        };
        let user_id = UserId::new(row.user_id).map_err(corrupt)?;
        let provider = row.provider.parse::<Provider>().map_err(corrupt)?;
        let status = row.status.parse::<SubscriptionStatus>().map_err(corrupt)?;

        Ok(Subscription {
            id: row.id,
            user_id,
            circle_id: row.circle_id.map(CircleId::new),
            provider,
            external_subscription_id: row.external_subscription_id,
            external_customer_id: row.external_customer_id,
            product_id: row.product_id,
            status,
            expires_at: row.expires_at.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
            provider_data: row.provider_data,
        })
    }
}

async fn write_mirror(conn: &mut PgConnection, mirror: &MirrorSubscription) -> Result<(), DomainError> {
    sqlx::query(
        r#"
        INSERT INTO stripe_subscriptions (subscription_id, customer_id, status, expired_at, updated_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (subscription_id) DO UPDATE SET
            customer_id = EXCLUDED.customer_id,
            status = EXCLUDED.status,
            expired_at = EXCLUDED.expired_at,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(&mirror.subscription_id)
    .bind(&mirror.customer_id)
    .bind(mirror.status.legacy_str())
    .bind(mirror.expired_at.map(|t| *t.as_datetime()))
    .bind(mirror.updated_at.as_datetime())
    .execute(conn)
    .await
    .map_err(|e| DomainError::database("Failed to write subscription mirror", e))?;

    Ok(())
}

/// Patches an existing mirror row. Returns false if there is none or the
/// status gate rejects the change.
async fn patch_mirror(
    conn: &mut PgConnection,
    id: &str,
    update: &SubscriptionUpdate,
    now: Timestamp,
) -> Result<bool, DomainError> {
    let current: Option<String> = sqlx::query_scalar(
        "SELECT status FROM stripe_subscriptions WHERE subscription_id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| DomainError::database("Failed to lock subscription mirror", e))?;

    let Some(current) = current else {
        return Ok(false);
    };
    let current = current.parse::<SubscriptionStatus>().map_err(|e| {
        DomainError::new(ErrorCode::DatabaseError, format!("Invalid mirror status: {}", e))
    })?;
    if !update.permits(current) {
        return Ok(false);
    }

    sqlx::query(
        r#"
        UPDATE stripe_subscriptions SET
            status = COALESCE($2, status),
            expired_at = COALESCE($3, expired_at),
            updated_at = $4
        WHERE subscription_id = $1
        "#,
    )
    .bind(id)
    .bind(update.status.map(|s| s.legacy_str()))
    .bind(update.expires_at.map(|t| *t.as_datetime()))
    .bind(now.as_datetime())
    .execute(conn)
    .await
    .map_err(|e| DomainError::database("Failed to update subscription mirror", e))?;

    Ok(true)
}

async fn write_subscription(
    conn: &mut PgConnection,
    subscription: &Subscription,
) -> Result<(), DomainError> {
    sqlx::query(
        r#"
        INSERT INTO subscriptions (
            id, user_id, circle_id, provider, external_subscription_id, external_customer_id,
            product_id, status, expires_at, created_at, updated_at, provider_data
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ON CONFLICT (provider, external_subscription_id) DO UPDATE SET
            user_id = EXCLUDED.user_id,
            circle_id = EXCLUDED.circle_id,
            external_customer_id = EXCLUDED.external_customer_id,
            product_id = EXCLUDED.product_id,
            status = EXCLUDED.status,
            expires_at = EXCLUDED.expires_at,
            updated_at = EXCLUDED.updated_at,
            provider_data = EXCLUDED.provider_data
        "#,
    )
    .bind(&subscription.id)
    .bind(subscription.user_id.as_i64())
    .bind(subscription.circle_id.map(|c| c.as_i64()))
    .bind(subscription.provider.as_str())
    .bind(&subscription.external_subscription_id)
    .bind(&subscription.external_customer_id)
    .bind(&subscription.product_id)
    .bind(subscription.status.as_str())
    .bind(subscription.expires_at.map(|t| *t.as_datetime()))
    .bind(subscription.created_at.as_datetime())
    .bind(subscription.updated_at.as_datetime())
    .bind(&subscription.provider_data)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        DomainError::database("Failed to upsert subscription", e)
            .with_detail("subscription_id", subscription.id.clone())
    })?;

    if subscription.provider.has_legacy_mirror() {
        write_mirror(conn, &MirrorSubscription::from(subscription)).await?;
    }
    Ok(())
}

/// Lock, gate and update one row on `conn`. The caller commits.
async fn apply_locked(
    conn: &mut PgConnection,
    provider: Provider,
    id: &str,
    update: &SubscriptionUpdate,
    now: Timestamp,
) -> Result<UpdateOutcome, DomainError> {
    let row: Option<SubscriptionRow> =
        sqlx::query_as(&format!("{} WHERE id = $1 FOR UPDATE", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| DomainError::database("Failed to lock subscription", e))?;

    let Some(row) = row else {
        let mirror_updated = if provider.has_legacy_mirror() && update.touches_mirror() {
            patch_mirror(conn, id, update, now).await?
        } else {
            false
        };
        return Ok(UpdateOutcome::NotFound { mirror_updated });
    };

    let mut subscription = Subscription::try_from(row)?;
    if let Err(current) = subscription.apply(update, now) {
        return Ok(UpdateOutcome::Skipped {
            current,
            requested: update.status.unwrap_or(current),
        });
    }

    sqlx::query(
        r#"
        UPDATE subscriptions SET
            status = COALESCE($2, status),
            expires_at = COALESCE($3, expires_at),
            product_id = COALESCE($4, product_id),
            user_id = COALESCE($5, user_id),
            external_customer_id = COALESCE($6, external_customer_id),
            updated_at = $7
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(update.status.map(|s| s.as_str()))
    .bind(update.expires_at.map(|t| *t.as_datetime()))
    .bind(update.product_id.as_deref())
    .bind(update.owner.as_ref().map(|o| o.user_id.as_i64()))
    .bind(update.owner.as_ref().map(|o| o.external_customer_id.as_str()))
    .bind(now.as_datetime())
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        DomainError::database("Failed to update subscription", e).with_detail("subscription_id", id)
    })?;

    if subscription.provider.has_legacy_mirror() && update.touches_mirror() {
        write_mirror(conn, &MirrorSubscription::from(&subscription)).await?;
    }

    Ok(UpdateOutcome::Applied(subscription))
}

#[async_trait]
impl SubscriptionStore for PostgresSubscriptionStore {
    async fn upsert(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database("Failed to begin transaction", e))?;

        write_subscription(&mut tx, subscription).await?;

        tx.commit()
            .await
            .map_err(|e| DomainError::database("Failed to commit subscription upsert", e))
    }

    async fn upsert_mirror(&self, mirror: &MirrorSubscription) -> Result<(), DomainError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| DomainError::database("Failed to acquire connection", e))?;
        write_mirror(&mut conn, mirror).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!("{} WHERE id = $1", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to find subscription", e))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_active_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "{} WHERE user_id = $1 AND status = 'active' ORDER BY created_at DESC LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(user_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to find active subscription", e))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn apply(
        &self,
        provider: Provider,
        id: &str,
        update: &SubscriptionUpdate,
    ) -> Result<UpdateOutcome, DomainError> {
        let now = Timestamp::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database("Failed to begin transaction", e))?;

        let outcome = apply_locked(&mut tx, provider, id, update, now).await?;

        tx.commit()
            .await
            .map_err(|e| DomainError::database("Failed to commit subscription update", e))?;
        Ok(outcome)
    }

    async fn claim_and_upsert(
        &self,
        event: &ProcessedEvent,
        subscription: &Subscription,
    ) -> Result<Claim<()>, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database("Failed to begin transaction", e))?;

        // Dropping the transaction rolls back on every early return.
        if !insert_event(&mut tx, event).await? {
            return Ok(Claim::AlreadyClaimed);
        }
        write_subscription(&mut tx, subscription).await?;

        tx.commit()
            .await
            .map_err(|e| DomainError::database("Failed to commit claimed upsert", e))?;
        Ok(Claim::Won(()))
    }

    async fn claim_and_apply(
        &self,
        event: &ProcessedEvent,
        provider: Provider,
        id: &str,
        update: &SubscriptionUpdate,
    ) -> Result<Claim<UpdateOutcome>, DomainError> {
        let now = Timestamp::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database("Failed to begin transaction", e))?;

        if !insert_event(&mut tx, event).await? {
            return Ok(Claim::AlreadyClaimed);
        }
        let outcome = apply_locked(&mut tx, provider, id, update, now).await?;

        tx.commit()
            .await
            .map_err(|e| DomainError::database("Failed to commit claimed update", e))?;
        Ok(Claim::Won(outcome))
    }

    async fn find_mirror(&self, id: &str) -> Result<Option<MirrorSubscription>, DomainError> {
        let row: Option<(String, String, String, Option<DateTime<Utc>>, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT subscription_id, customer_id, status, expired_at, updated_at
            FROM stripe_subscriptions
            WHERE subscription_id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to find subscription mirror", e))?;

        row.map(|(subscription_id, customer_id, status, expired_at, updated_at)| {
            let status = status.parse::<SubscriptionStatus>().map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid mirror status: {}", e))
            })?;
            Ok(MirrorSubscription {
                subscription_id,
                customer_id,
                status,
                expired_at: expired_at.map(Timestamp::from_datetime),
                updated_at: Timestamp::from_datetime(updated_at),
            })
        })
        .transpose()
    }
}
