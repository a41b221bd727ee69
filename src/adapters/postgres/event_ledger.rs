//! PostgreSQL implementation of EventLedger.
//!
//! The primary key on `event_id` arbitrates concurrent deliveries: the
//! loser of the insert race sees zero affected rows.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};

use crate::domain::billing::ProcessedEvent;
use crate::domain::foundation::DomainError;
use crate::ports::{EventLedger, SaveResult};

/// Insert a ledger row on `conn`. Returns false when the id is taken.
///
/// Run inside a transaction, a concurrent insert of the same id blocks until
/// this one commits or rolls back.
pub(super) async fn insert_event(
    conn: &mut PgConnection,
    event: &ProcessedEvent,
) -> Result<bool, DomainError> {
    let result = sqlx::query(
        r#"
        INSERT INTO revenuecat_events (
            event_id, event_type, app_user_id, original_app_user_id, product_id,
            store, event_timestamp, processed_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (event_id) DO NOTHING
        "#,
    )
    .bind(&event.event_id)
    .bind(&event.event_type)
    .bind(&event.app_user_id)
    .bind(&event.original_app_user_id)
    .bind(&event.product_id)
    .bind(&event.store)
    .bind(event.event_timestamp.as_datetime())
    .bind(event.processed_at.as_datetime())
    .execute(conn)
    .await
    .map_err(|e| {
        DomainError::database("Failed to record processed event", e)
            .with_detail("event_id", event.event_id.clone())
    })?;

    Ok(result.rows_affected() > 0)
}

pub struct PostgresEventLedger {
    pool: PgPool,
}

impl PostgresEventLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventLedger for PostgresEventLedger {
    async fn exists(&self, event_id: &str) -> Result<bool, DomainError> {
        let found: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM revenuecat_events WHERE event_id = $1)",
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to check processed event", e))?;

        Ok(found)
    }

    async fn record(&self, event: &ProcessedEvent) -> Result<SaveResult, DomainError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| DomainError::database("Failed to acquire connection", e))?;

        if insert_event(&mut conn, event).await? {
            Ok(SaveResult::Inserted)
        } else {
            Ok(SaveResult::AlreadyExists)
        }
    }
}
