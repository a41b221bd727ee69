//! PostgreSQL implementation of StripeLedger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::billing::{CheckoutSessionRecord, InvoiceRecord, StripeCustomer};
use crate::domain::foundation::{CircleId, DomainError, ErrorCode, Timestamp, UserId};
use crate::ports::{SaveResult, StripeLedger};

pub struct PostgresStripeLedger {
    pool: PgPool,
}

impl PostgresStripeLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    customer_id: String,
    user_id: i64,
    circle_id: Option<i64>,
    created_at: DateTime<Utc>,
}

impl TryFrom<CustomerRow> for StripeCustomer {
    type Error = DomainError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        Ok(StripeCustomer {
            user_id: parse_user_id(row.user_id)?,
            customer_id: row.customer_id,
            circle_id: row.circle_id.map(CircleId::new),
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    session_id: String,
    customer_id: String,
    user_id: i64,
    status: String,
}

#[derive(Debug, sqlx::FromRow)]
struct InvoiceRow {
    invoice_id: String,
    amount: i64,
    currency: Option<String>,
    status: String,
    subscription_id: String,
    customer_id: String,
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    received_at: DateTime<Utc>,
}

fn parse_user_id(raw: i64) -> Result<UserId, DomainError> {
    UserId::new(raw).map_err(|e| {
        DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
    })
}

#[async_trait]
impl StripeLedger for PostgresStripeLedger {
    async fn find_customer_by_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<StripeCustomer>, DomainError> {
        let row: Option<CustomerRow> = sqlx::query_as(
            "SELECT customer_id, user_id, circle_id, created_at FROM stripe_customers WHERE user_id = $1",
        )
        .bind(user_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to find customer", e))?;

        row.map(StripeCustomer::try_from).transpose()
    }

    async fn find_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<StripeCustomer>, DomainError> {
        let row: Option<CustomerRow> = sqlx::query_as(
            "SELECT customer_id, user_id, circle_id, created_at FROM stripe_customers WHERE customer_id = $1",
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to find customer", e))?;

        row.map(StripeCustomer::try_from).transpose()
    }

    async fn save_customer(&self, customer: &StripeCustomer) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO stripe_customers (customer_id, user_id, circle_id, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&customer.customer_id)
        .bind(customer.user_id.as_i64())
        .bind(customer.circle_id.map(|c| c.as_i64()))
        .bind(customer.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::database("Failed to save customer", e)
                .with_detail("customer_id", customer.customer_id.clone())
        })?;

        Ok(())
    }

    async fn save_session(&self, session: &CheckoutSessionRecord) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO stripe_sessions (session_id, customer_id, user_id, status)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (session_id) DO NOTHING
            "#,
        )
        .bind(&session.session_id)
        .bind(&session.customer_id)
        .bind(session.user_id.as_i64())
        .bind(&session.status)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to save checkout session", e))?;

        Ok(())
    }

    async fn update_session_status(
        &self,
        session_id: &str,
        status: &str,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            "UPDATE stripe_sessions SET status = $2, updated_at = NOW() WHERE session_id = $1",
        )
        .bind(session_id)
        .bind(status)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to update checkout session", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_session(
        &self,
        session_id: &str,
    ) -> Result<Option<CheckoutSessionRecord>, DomainError> {
        let row: Option<SessionRow> = sqlx::query_as(
            "SELECT session_id, customer_id, user_id, status FROM stripe_sessions WHERE session_id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to find checkout session", e))?;

        row.map(|row| {
            Ok(CheckoutSessionRecord {
                user_id: parse_user_id(row.user_id)?,
                session_id: row.session_id,
                customer_id: row.customer_id,
                status: row.status,
            })
        })
        .transpose()
    }

    async fn record_invoice(&self, invoice: &InvoiceRecord) -> Result<SaveResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO stripe_invoices (
                invoice_id, amount, currency, status, subscription_id, customer_id,
                period_start, period_end, received_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (invoice_id) DO NOTHING
            "#,
        )
        .bind(&invoice.invoice_id)
        .bind(invoice.amount)
        .bind(&invoice.currency)
        .bind(&invoice.status)
        .bind(&invoice.subscription_id)
        .bind(&invoice.customer_id)
        .bind(invoice.period_start.as_datetime())
        .bind(invoice.period_end.as_datetime())
        .bind(invoice.received_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::database("Failed to record invoice", e)
                .with_detail("invoice_id", invoice.invoice_id.clone())
        })?;

        if result.rows_affected() == 0 {
            Ok(SaveResult::AlreadyExists)
        } else {
            Ok(SaveResult::Inserted)
        }
    }

    async fn find_invoice(&self, invoice_id: &str) -> Result<Option<InvoiceRecord>, DomainError> {
        let row: Option<InvoiceRow> = sqlx::query_as(
            r#"
            SELECT invoice_id, amount, currency, status, subscription_id, customer_id,
                   period_start, period_end, received_at
            FROM stripe_invoices
            WHERE invoice_id = $1
            "#,
        )
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to find invoice", e))?;

        Ok(row.map(|row| InvoiceRecord {
            invoice_id: row.invoice_id,
            amount: row.amount,
            currency: row.currency,
            status: row.status,
            subscription_id: row.subscription_id,
            customer_id: row.customer_id,
            period_start: Timestamp::from_datetime(row.period_start),
            period_end: Timestamp::from_datetime(row.period_end),
            received_at: Timestamp::from_datetime(row.received_at),
        }))
    }
}
