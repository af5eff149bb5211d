//! Atomic settlement
//!
//! Debit, credit and the SUCCESS status write applied as one unit, so a
//! failure or crash in the middle leaves nothing half-applied. The PENDING
//! check inside the unit makes a replayed job a no-op.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;

use super::error::TransferError;
use super::types::SettlementJob;
use crate::account::UserId;

/// Single all-or-nothing settlement
///
/// Errors: `TransactionNotFound`, `AlreadyFinalized`, `BalanceRead`,
/// `InsufficientFunds`, `BalanceWrite`, `StatusUpdate`. On any error
/// nothing was written.
#[async_trait]
pub trait AtomicSettlement: Send + Sync {
    async fn settle(&self, job: &SettlementJob) -> Result<(), TransferError>;
}

/// PostgreSQL settlement in one SQL transaction
///
/// Row locks are taken transaction first, then users in id order, so two
/// settlements touching the same accounts cannot deadlock.
pub struct PgAtomicSettlement {
    pool: PgPool,
}

impl PgAtomicSettlement {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AtomicSettlement for PgAtomicSettlement {
    async fn settle(&self, job: &SettlementJob) -> Result<(), TransferError> {
        let mut db_tx = self.pool.begin().await?;

        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM transactions WHERE id = $1 FOR UPDATE")
                .bind(job.transaction_id.inner())
                .fetch_optional(&mut *db_tx)
                .await?;

        match status.as_deref() {
            None => {
                return Err(TransferError::TransactionNotFound(
                    job.transaction_id.to_string(),
                ));
            }
            Some("PENDING") => {}
            Some(_) => return Err(TransferError::AlreadyFinalized),
        }

        let mut ordered = [job.sender_id, job.receiver_id];
        ordered.sort();

        let mut sender_balance: Option<Decimal> = None;
        let mut receiver_balance: Option<Decimal> = None;
        for user_id in ordered {
            let balance: Decimal =
                sqlx::query_scalar("SELECT balance FROM users WHERE id = $1 FOR UPDATE")
                    .bind(user_id)
                    .fetch_optional(&mut *db_tx)
                    .await
                    .map_err(|e| TransferError::BalanceRead(e.to_string()))?
                    .ok_or_else(|| TransferError::BalanceRead(format!("user {} not found", user_id)))?;

            if user_id == job.sender_id {
                sender_balance = Some(balance);
            }
            if user_id == job.receiver_id {
                receiver_balance = Some(balance);
            }
        }

        let (Some(sender_balance), Some(receiver_balance)) = (sender_balance, receiver_balance)
        else {
            return Err(TransferError::BalanceRead("balance not loaded".to_string()));
        };

        if sender_balance < job.amount {
            return Err(TransferError::InsufficientFunds);
        }

        let (debited, credited) = job.moved_balances(sender_balance, receiver_balance)?;
        write_balance(&mut db_tx, job.sender_id, debited).await?;
        write_balance(&mut db_tx, job.receiver_id, credited).await?;

        sqlx::query("UPDATE transactions SET status = 'SUCCESS' WHERE id = $1 AND status = 'PENDING'")
            .bind(job.transaction_id.inner())
            .execute(&mut *db_tx)
            .await
            .map_err(|e| TransferError::StatusUpdate(e.to_string()))?;

        db_tx
            .commit()
            .await
            .map_err(|e| TransferError::StatusUpdate(e.to_string()))?;

        Ok(())
    }
}

async fn write_balance(
    db_tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: UserId,
    balance: Decimal,
) -> Result<(), TransferError> {
    sqlx::query("UPDATE users SET balance = $1 WHERE id = $2")
        .bind(balance)
        .bind(user_id)
        .execute(&mut **db_tx)
        .await
        .map_err(|e| TransferError::BalanceWrite(e.to_string()))?;
    Ok(())
}
