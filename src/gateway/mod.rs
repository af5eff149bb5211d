//! HTTP Gateway
//!
//! Thin axum layer over [`crate::transfer::TransferService`] and
//! [`crate::account::UserService`]. Swagger UI is served at `/docs`,
//! Prometheus metrics at `/metrics`.

pub mod handlers;
pub mod metrics;
pub mod openapi;
pub mod state;
pub mod types;

use anyhow::Context;
use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

// OpenAPI / Swagger UI
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::GatewayConfig;
use state::AppState;

/// Build the complete router
pub fn router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health_check))
        // Transfers
        .route("/transfers", post(handlers::create_transfer))
        .route("/transfers/{user_id}", get(handlers::get_transfers))
        .route("/transactions/{transaction_id}", get(handlers::get_transaction))
        // Accounts
        .route("/balance/{user_id}", get(handlers::get_balance))
        .route("/users/{user_id}", get(handlers::get_user));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(metrics::metrics_handler))
        // Only routed requests, labelled by their matched template
        .route_layer(from_fn_with_state(state.clone(), metrics::track_metrics))
        .with_state(state)
        // Stateless, added after with_state
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
}

/// Serve the gateway until `shutdown` resolves
pub async fn run_server(
    config: &GatewayConfig,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}, is the port already in use?"))?;

    info!(addr = %addr, "Gateway listening");
    info!("API Docs: http://{}/docs", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")?;

    info!("Gateway stopped");
    Ok(())
}
