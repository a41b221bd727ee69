//! PostgreSQL implementation of UserDirectory.
//!
//! Reads the `users` table owned by the surrounding application. This
//! crate never writes to it and does not migrate it.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{CircleId, DomainError, UserId};
use crate::ports::{UserDirectory, UserProfile};

pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    name: Option<String>,
    email: Option<String>,
    circle_id: Option<i64>,
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn find_by_id(&self, user_id: UserId) -> Result<Option<UserProfile>, DomainError> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT name, email, circle_id FROM users WHERE id = $1")
                .bind(user_id.as_i64())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DomainError::database("Failed to find user", e))?;

        Ok(row.map(|row| UserProfile {
            id: user_id,
            display_name: row.name,
            email: row.email,
            circle_id: row.circle_id.map(CircleId::new),
        }))
    }
}
