//! Transfer Core Types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use super::error::TransferError;
use super::state::TransactionStatus;
use crate::account::UserId;

/// Decimal places kept by the `NUMERIC(20, 8)` money columns
pub const AMOUNT_SCALE: u32 = 8;

/// Largest value a `NUMERIC(20, 8)` column holds: 999999999999.99999999
pub fn max_amount() -> Decimal {
    Decimal::from_i128_with_scale(99_999_999_999_999_999_999, AMOUNT_SCALE)
}

/// A transfer amount must be positive, fit the money columns and carry no
/// more than [`AMOUNT_SCALE`] decimal places. Anything finer would be
/// rounded by the database independently on each side of the transfer.
pub fn validate_amount(amount: Decimal) -> Result<(), TransferError> {
    if amount <= Decimal::ZERO {
        return Err(TransferError::InvalidAmount);
    }
    if amount.normalize().scale() > AMOUNT_SCALE {
        return Err(TransferError::InvalidAmount);
    }
    if amount > max_amount() {
        return Err(TransferError::InvalidAmount);
    }
    Ok(())
}

/// Transaction identifier (UUID v4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct TransactionId(Uuid);

impl TransactionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for TransactionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TransactionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A recorded transfer between two users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    pub id: TransactionId,
    #[schema(value_type = String, format = Uuid)]
    pub sender_id: UserId,
    #[schema(value_type = String, format = Uuid)]
    pub receiver_id: UserId,
    #[schema(value_type = String, example = "80.00")]
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// New PENDING transaction with a fresh id, stamped now
    pub fn pending(sender_id: UserId, receiver_id: UserId, amount: Decimal) -> Self {
        Self {
            id: TransactionId::new(),
            sender_id,
            receiver_id,
            amount,
            status: TransactionStatus::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn involves(&self, user_id: UserId) -> bool {
        self.sender_id == user_id || self.receiver_id == user_id
    }
}

/// Settlement job carried by the in-process queue. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SettlementJob {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub amount: Decimal,
    pub transaction_id: TransactionId,
}

impl SettlementJob {
    /// Sender and receiver balances after moving `amount`.
    ///
    /// Overflow on either side is a `BalanceWrite` failure, computed before
    /// anything is written.
    pub fn moved_balances(
        &self,
        sender_balance: Decimal,
        receiver_balance: Decimal,
    ) -> Result<(Decimal, Decimal), TransferError> {
        let debited = sender_balance
            .checked_sub(self.amount)
            .ok_or_else(|| TransferError::BalanceWrite("sender balance overflow".to_string()))?;
        let credited = receiver_balance
            .checked_add(self.amount)
            .ok_or_else(|| TransferError::BalanceWrite("receiver balance overflow".to_string()))?;
        Ok((debited, credited))
    }
}

impl From<&Transaction> for SettlementJob {
    fn from(tx: &Transaction) -> Self {
        Self {
            sender_id: tx.sender_id,
            receiver_id: tx.receiver_id,
            amount: tx.amount,
            transaction_id: tx.id,
        }
    }
}

/// Result of running one job whose final status write went through
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// Balances moved, transaction marked SUCCESS
    Settled,
    /// Transaction marked FAILED for the given reason
    Rejected(TransferError),
}

impl SettlementOutcome {
    pub fn status(&self) -> TransactionStatus {
        match self {
            SettlementOutcome::Settled => TransactionStatus::Success,
            SettlementOutcome::Rejected(_) => TransactionStatus::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_id_parse_display() {
        let id = TransactionId::new();
        let parsed: TransactionId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<TransactionId>().is_err());
    }

    #[test]
    fn test_pending_transaction() {
        let sender = Uuid::new_v4();
        let receiver = Uuid::new_v4();
        let tx = Transaction::pending(sender, receiver, Decimal::from(80));
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert!(tx.involves(sender));
        assert!(tx.involves(receiver));
        assert!(!tx.involves(Uuid::new_v4()));
    }

    #[test]
    fn test_job_from_transaction() {
        let tx = Transaction::pending(Uuid::new_v4(), Uuid::new_v4(), Decimal::from(5));
        let job = SettlementJob::from(&tx);
        assert_eq!(job.transaction_id, tx.id);
        assert_eq!(job.sender_id, tx.sender_id);
        assert_eq!(job.receiver_id, tx.receiver_id);
        assert_eq!(job.amount, tx.amount);
    }

    #[test]
    fn test_transaction_json_shape() {
        let tx = Transaction::pending(Uuid::new_v4(), Uuid::new_v4(), Decimal::new(8000, 2));
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["status"], "PENDING");
        assert_eq!(json["amount"], "80.00");
        assert_eq!(json["id"], tx.id.to_string());
    }

    #[test]
    fn test_validate_amount() {
        assert!(validate_amount(Decimal::new(8000, 2)).is_ok());
        assert!(validate_amount(Decimal::new(1, 8)).is_ok());
        // Trailing zeros beyond the column scale are harmless
        assert!(validate_amount(Decimal::new(1_000_000_000, 9)).is_ok());
        assert!(validate_amount(max_amount()).is_ok());

        assert_eq!(validate_amount(Decimal::ZERO), Err(TransferError::InvalidAmount));
        assert_eq!(validate_amount(Decimal::from(-5)), Err(TransferError::InvalidAmount));
        assert_eq!(validate_amount(Decimal::new(5, 9)), Err(TransferError::InvalidAmount));
        assert_eq!(validate_amount(Decimal::new(4, 9)), Err(TransferError::InvalidAmount));
        assert_eq!(
            validate_amount(max_amount() + Decimal::new(1, 8)),
            Err(TransferError::InvalidAmount)
        );
        assert_eq!(
            validate_amount(Decimal::from(4) * Decimal::from(10_i64.pow(18))),
            Err(TransferError::InvalidAmount)
        );
    }

    #[test]
    fn test_moved_balances_checked() {
        let tx = Transaction::pending(Uuid::new_v4(), Uuid::new_v4(), Decimal::from(30));
        let job = SettlementJob::from(&tx);
        assert_eq!(
            job.moved_balances(Decimal::from(100), Decimal::from(50)),
            Ok((Decimal::from(70), Decimal::from(80)))
        );

        let receiver_at_max = Decimal::MAX - Decimal::from(10);
        assert!(matches!(
            job.moved_balances(Decimal::from(100), receiver_at_max),
            Err(TransferError::BalanceWrite(_))
        ));
    }

    #[test]
    fn test_outcome_status() {
        assert_eq!(SettlementOutcome::Settled.status(), TransactionStatus::Success);
        assert_eq!(
            SettlementOutcome::Rejected(TransferError::InsufficientFunds).status(),
            TransactionStatus::Failed
        );
    }
}
