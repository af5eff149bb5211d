//! Transfer Error Types

use thiserror::Error;

use crate::db::StoreError;

/// Transfer error types
///
/// Acceptance errors (`InvalidAmount`, `SameAccount`, `TransactionPersist`)
/// reach the caller directly. Settlement errors never do: the worker turns
/// them into a FAILED status on the transaction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    // === Validation Errors ===
    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Sender and receiver cannot be the same account")]
    SameAccount,

    // === Settlement Errors ===
    #[error("Failed to read balance: {0}")]
    BalanceRead(String),

    #[error("Insufficient funds")]
    InsufficientFunds,

    #[error("Failed to write balance: {0}")]
    BalanceWrite(String),

    #[error("Settlement step timed out: {0}")]
    Timeout(String),

    #[error("Transaction already finalized")]
    AlreadyFinalized,

    // === Persistence Errors ===
    #[error("Failed to persist transaction: {0}")]
    TransactionPersist(String),

    #[error("Failed to update transaction status: {0}")]
    StatusUpdate(String),

    #[error("Settlement queue is closed")]
    QueueClosed,

    // === Lookup Errors ===
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl TransferError {
    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::InvalidAmount => "INVALID_AMOUNT",
            TransferError::SameAccount => "SAME_ACCOUNT",
            TransferError::BalanceRead(_) => "BALANCE_READ_ERROR",
            TransferError::InsufficientFunds => "INSUFFICIENT_FUNDS",
            TransferError::BalanceWrite(_) => "BALANCE_WRITE_ERROR",
            TransferError::Timeout(_) => "TIMEOUT",
            TransferError::AlreadyFinalized => "ALREADY_FINALIZED",
            TransferError::TransactionPersist(_) => "TRANSACTION_PERSIST_ERROR",
            TransferError::StatusUpdate(_) => "STATUS_UPDATE_ERROR",
            TransferError::QueueClosed => "QUEUE_CLOSED",
            TransferError::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            TransferError::UserNotFound(_) => "USER_NOT_FOUND",
            TransferError::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            TransferError::InvalidAmount | TransferError::SameAccount => 400,
            TransferError::TransactionNotFound(_) | TransferError::UserNotFound(_) => 404,
            TransferError::AlreadyFinalized => 409,
            TransferError::InsufficientFunds => 422,
            TransferError::QueueClosed => 503,
            TransferError::Timeout(_) => 504,
            TransferError::BalanceRead(_)
            | TransferError::BalanceWrite(_)
            | TransferError::TransactionPersist(_)
            | TransferError::StatusUpdate(_)
            | TransferError::Database(_) => 500,
        }
    }
}

impl From<StoreError> for TransferError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => TransferError::TransactionNotFound(what),
            StoreError::Conflict(_) => TransferError::AlreadyFinalized,
            StoreError::Database(msg) => TransferError::Database(msg),
        }
    }
}

impl From<sqlx::Error> for TransferError {
    fn from(e: sqlx::Error) -> Self {
        TransferError::Database(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(TransferError::InvalidAmount.code(), "INVALID_AMOUNT");
        assert_eq!(TransferError::InsufficientFunds.code(), "INSUFFICIENT_FUNDS");
        assert_eq!(
            TransferError::TransactionPersist("x".into()).code(),
            "TRANSACTION_PERSIST_ERROR"
        );
    }

    #[test]
    fn test_http_status() {
        assert_eq!(TransferError::InvalidAmount.http_status(), 400);
        assert_eq!(TransferError::SameAccount.http_status(), 400);
        assert_eq!(
            TransferError::TransactionNotFound("t".into()).http_status(),
            404
        );
        assert_eq!(TransferError::InsufficientFunds.http_status(), 422);
        assert_eq!(TransferError::Database("db".into()).http_status(), 500);
        assert_eq!(TransferError::QueueClosed.http_status(), 503);
    }

    #[test]
    fn test_from_store_error() {
        assert_eq!(
            TransferError::from(StoreError::Conflict("done".into())),
            TransferError::AlreadyFinalized
        );
        assert!(matches!(
            TransferError::from(StoreError::Database("down".into())),
            TransferError::Database(_)
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            TransferError::InvalidAmount.to_string(),
            "Amount must be greater than zero"
        );
        assert_eq!(TransferError::InsufficientFunds.to_string(), "Insufficient funds");
    }
}
