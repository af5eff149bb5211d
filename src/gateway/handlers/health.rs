//! Health check handler

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{Json, extract::State, http::StatusCode};
use utoipa::ToSchema;

use super::super::state::AppState;
use super::super::types::{ApiResponse, error_codes};

/// Health check response data
#[derive(serde::Serialize, ToSchema)]
pub struct HealthResponse {
    /// Server timestamp in milliseconds
    #[schema(example = 1703494800000_u64)]
    pub timestamp_ms: u64,
    /// Build git hash
    #[schema(example = "a1b2c3d")]
    pub version: String,
}

/// Health check endpoint
///
/// Unhealthy when the settlement queue is closed. Pings PostgreSQL when one
/// is configured, at most once per interval. The response never exposes
/// dependency details.
///
/// - Healthy: 200 OK + {code: 0, data: {timestamp_ms, version}}
/// - Unhealthy: 503 Service Unavailable + {code: 5001, msg: "unavailable"}
#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse, content_type = "application/json"),
        (status = 503, description = "Service unavailable")
    ),
    tag = "System"
)]
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ApiResponse<HealthResponse>>) {
    // Rate limit: only ping DB once per interval
    static LAST_CHECK_MS: AtomicU64 = AtomicU64::new(0);
    const CHECK_INTERVAL_MS: u64 = 5000;

    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    let settlement_up = state.transfers.settlement_available();
    if !settlement_up {
        tracing::warn!("Settlement queue closed");
    }

    let db_up = match state.pg_db {
        Some(ref db) => {
            let last_check = LAST_CHECK_MS.load(Ordering::Relaxed);
            if now_ms.saturating_sub(last_check) > CHECK_INTERVAL_MS {
                match db.health_check().await {
                    Ok(()) => {
                        LAST_CHECK_MS.store(now_ms, Ordering::Relaxed);
                        true
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "PostgreSQL ping failed");
                        false
                    }
                }
            } else {
                true
            }
        }
        // Memory mode has nothing to ping
        None => true,
    };
    let healthy = settlement_up && db_up;

    if healthy {
        (
            StatusCode::OK,
            Json(ApiResponse::success(HealthResponse {
                timestamp_ms: now_ms,
                version: env!("GIT_HASH").to_string(),
            })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse {
                code: error_codes::SERVICE_UNAVAILABLE,
                msg: "unavailable".to_string(),
                data: None,
            }),
        )
    }
}
