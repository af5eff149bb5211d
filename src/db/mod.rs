//! Database connection management and store-level errors

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use thiserror::Error;

/// Errors reported by the balance store and the transaction ledger
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Write rejected because the record is not in the expected state
    #[error("Conflicting update: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StoreError::NotFound("row not found".to_string()),
            other => StoreError::Database(other.to_string()),
        }
    }
}

const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id          UUID PRIMARY KEY,
    first_name  TEXT NOT NULL,
    last_name   TEXT NOT NULL,
    email       TEXT NOT NULL UNIQUE,
    balance     NUMERIC(20, 8) NOT NULL DEFAULT 0
)
"#;

const CREATE_TRANSACTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS transactions (
    id           UUID PRIMARY KEY,
    sender_id    UUID NOT NULL REFERENCES users (id),
    receiver_id  UUID NOT NULL REFERENCES users (id),
    amount       NUMERIC(20, 8) NOT NULL CHECK (amount > 0),
    status       TEXT NOT NULL,
    created_at   TIMESTAMPTZ NOT NULL
)
"#;

const CREATE_TRANSACTIONS_INDEXES: [&str; 3] = [
    "CREATE INDEX IF NOT EXISTS idx_transactions_sender ON transactions (sender_id)",
    "CREATE INDEX IF NOT EXISTS idx_transactions_receiver ON transactions (receiver_id)",
    "CREATE INDEX IF NOT EXISTS idx_transactions_pending ON transactions (created_at) WHERE status = 'PENDING'",
];

/// PostgreSQL database connection pool
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        tracing::info!("PostgreSQL connection pool established");
        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Create `users` and `transactions` if they do not exist yet
    pub async fn init_schema(&self) -> Result<(), sqlx::Error> {
        tracing::info!("Initializing PostgreSQL schema...");
        sqlx::query(CREATE_USERS_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_TRANSACTIONS_TABLE)
            .execute(&self.pool)
            .await?;
        for stmt in CREATE_TRANSACTIONS_INDEXES {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        Ok(())
    }
}
