//! Transfer handlers (create, history, status polling)

use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
};
use uuid::Uuid;

use super::super::state::AppState;
use super::super::types::{
    ApiError, ApiResult, CreateTransferRequest, CreateTransferResponse, TransactionListResponse,
    accepted, ok,
};
use crate::transfer::{Transaction, TransactionId, TransactionStatus};

/// Create transfer endpoint
///
/// POST /api/v1/transfers
///
/// Answers as soon as the transfer is recorded; the outcome is read back
/// through the status or history endpoints.
#[utoipa::path(
    post,
    path = "/api/v1/transfers",
    request_body = CreateTransferRequest,
    responses(
        (status = 202, description = "Transfer accepted, settlement pending", body = CreateTransferResponse, content_type = "application/json"),
        (status = 400, description = "Invalid body, non-positive amount or same account"),
        (status = 500, description = "Transaction could not be recorded")
    ),
    tag = "Transfer"
)]
pub async fn create_transfer(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateTransferRequest>, JsonRejection>,
) -> ApiResult<CreateTransferResponse> {
    let Json(req) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let transaction_id = state
        .transfers
        .create_transfer(req.from, req.to, req.amount)
        .await?;

    accepted(CreateTransferResponse {
        transaction_id,
        status: TransactionStatus::Pending,
        message: "Transfer accepted for processing".to_string(),
    })
}

/// Transfer history endpoint
///
/// GET /api/v1/transfers/{user_id}
#[utoipa::path(
    get,
    path = "/api/v1/transfers/{user_id}",
    params(
        ("user_id" = Uuid, Path, description = "User id, as sender or receiver")
    ),
    responses(
        (status = 200, description = "Transactions, newest first", body = TransactionListResponse, content_type = "application/json"),
        (status = 400, description = "Invalid user id")
    ),
    tag = "Transfer"
)]
pub async fn get_transfers(
    State(state): State<Arc<AppState>>,
    user_id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<TransactionListResponse> {
    let Path(user_id) = user_id.map_err(|_| ApiError::bad_request("Invalid user id"))?;

    let transactions = state.transfers.get_transactions_by_user_id(user_id).await?;
    ok(TransactionListResponse { transactions })
}

/// Transaction status endpoint
///
/// GET /api/v1/transactions/{transaction_id}
#[utoipa::path(
    get,
    path = "/api/v1/transactions/{transaction_id}",
    params(
        ("transaction_id" = Uuid, Path, description = "Id returned by the create endpoint")
    ),
    responses(
        (status = 200, description = "Transaction with its current status", body = Transaction, content_type = "application/json"),
        (status = 400, description = "Invalid transaction id"),
        (status = 404, description = "Transaction not found")
    ),
    tag = "Transfer"
)]
pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    tx_id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Transaction> {
    let Path(tx_id) = tx_id.map_err(|_| ApiError::bad_request("Invalid transaction id"))?;

    let tx = state
        .transfers
        .get_transaction(TransactionId::from(tx_id))
        .await?;
    ok(tx)
}
