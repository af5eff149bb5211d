//! Request and response bodies for the transfer and account endpoints

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::transfer::{Transaction, TransactionId, TransactionStatus};

/// Transfer request body
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateTransferRequest {
    /// Sender user id
    pub from: Uuid,
    /// Receiver user id
    pub to: Uuid,
    /// Accepts a JSON string or number
    #[schema(value_type = String, example = "80.00")]
    pub amount: Decimal,
}

/// Transfer accepted for settlement
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateTransferResponse {
    pub transaction_id: TransactionId,
    /// Always PENDING: settlement happens after the response
    pub status: TransactionStatus,
    #[schema(example = "Transfer accepted for processing")]
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionListResponse {
    /// Newest first
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BalanceResponse {
    pub user_id: Uuid,
    #[schema(value_type = String, example = "100.00")]
    pub balance: Decimal,
}
