//! Transaction Ledger
//!
//! Contract for transaction records and its PostgreSQL implementation.
//! Status updates are compare-and-set on PENDING, so a finalized transaction
//! can never be re-entered.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use super::state::TransactionStatus;
use super::types::{Transaction, TransactionId};
use crate::account::UserId;
use crate::db::StoreError;

/// Transaction record storage
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn create_transaction(&self, tx: &Transaction) -> Result<(), StoreError>;

    /// All transactions where the user is sender or receiver, newest first
    async fn get_transactions_by_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Transaction>, StoreError>;

    /// Move a PENDING transaction to a terminal status.
    ///
    /// Fails with [`StoreError::Conflict`] if the transaction is not PENDING
    /// and [`StoreError::NotFound`] if it does not exist.
    async fn update_transaction_status(
        &self,
        tx_id: TransactionId,
        status: TransactionStatus,
    ) -> Result<(), StoreError>;

    async fn get_transaction(&self, tx_id: TransactionId)
    -> Result<Option<Transaction>, StoreError>;

    /// Oldest PENDING transactions first
    async fn find_pending(&self, limit: usize) -> Result<Vec<Transaction>, StoreError>;
}

/// `transactions` table access
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn row_to_transaction(row: &PgRow) -> Result<Transaction, StoreError> {
    let status: String = row.try_get("status")?;
    let status = status
        .parse::<TransactionStatus>()
        .map_err(StoreError::Database)?;
    let id: uuid::Uuid = row.try_get("id")?;

    Ok(Transaction {
        id: id.into(),
        sender_id: row.try_get("sender_id")?,
        receiver_id: row.try_get("receiver_id")?,
        amount: row.try_get("amount")?,
        status,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl Ledger for PgLedger {
    async fn create_transaction(&self, tx: &Transaction) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO transactions (id, sender_id, receiver_id, amount, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(tx.id.inner())
        .bind(tx.sender_id)
        .bind(tx.receiver_id)
        .bind(tx.amount)
        .bind(tx.status.as_str())
        .bind(tx.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_transactions_by_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Transaction>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, sender_id, receiver_id, amount, status, created_at
            FROM transactions
            WHERE sender_id = $1 OR receiver_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_transaction).collect()
    }

    async fn update_transaction_status(
        &self,
        tx_id: TransactionId,
        status: TransactionStatus,
    ) -> Result<(), StoreError> {
        if !TransactionStatus::Pending.can_transition_to(status) {
            return Err(StoreError::Conflict(format!(
                "cannot move transaction {} to {}",
                tx_id, status
            )));
        }

        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET status = $1
            WHERE id = $2 AND status = 'PENDING'
            "#,
        )
        .bind(status.as_str())
        .bind(tx_id.inner())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        // Distinguish a missing row from one that is already terminal
        match self.get_transaction(tx_id).await? {
            Some(existing) => Err(StoreError::Conflict(format!(
                "transaction {} already {}",
                tx_id, existing.status
            ))),
            None => Err(StoreError::NotFound(format!("transaction {}", tx_id))),
        }
    }

    async fn get_transaction(
        &self,
        tx_id: TransactionId,
    ) -> Result<Option<Transaction>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, sender_id, receiver_id, amount, status, created_at
            FROM transactions
            WHERE id = $1
            "#,
        )
        .bind(tx_id.inner())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_transaction).transpose()
    }

    async fn find_pending(&self, limit: usize) -> Result<Vec<Transaction>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, sender_id, receiver_id, amount, status, created_at
            FROM transactions
            WHERE status = 'PENDING'
            ORDER BY created_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_transaction).collect()
    }
}
