//! Account handlers (balance, user profile)

use std::sync::Arc;

use axum::extract::{Path, State, rejection::PathRejection};
use uuid::Uuid;

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult, BalanceResponse, ok};
use crate::account::User;

/// Get user balance
///
/// GET /api/v1/balance/{user_id}
#[utoipa::path(
    get,
    path = "/api/v1/balance/{user_id}",
    params(
        ("user_id" = Uuid, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "Current balance", body = BalanceResponse, content_type = "application/json"),
        (status = 400, description = "Invalid user id"),
        (status = 404, description = "User not found")
    ),
    tag = "Account"
)]
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    user_id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<BalanceResponse> {
    let Path(user_id) = user_id.map_err(|_| ApiError::bad_request("Invalid user id"))?;

    let balance = state.users.get_balance(user_id).await?;
    ok(BalanceResponse { user_id, balance })
}

/// Get user profile
///
/// GET /api/v1/users/{user_id}
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}",
    params(
        ("user_id" = Uuid, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "User profile with balance", body = User, content_type = "application/json"),
        (status = 400, description = "Invalid user id"),
        (status = 404, description = "User not found")
    ),
    tag = "Account"
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    user_id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<User> {
    let Path(user_id) = user_id.map_err(|_| ApiError::bad_request("Invalid user id"))?;

    let user = state.users.get_by_id(user_id).await?;
    ok(user)
}
