//! Money Transfer Service
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌──────────┐    ┌──────────┐
//! │ Gateway  │───▶│  Ledger  │───▶│  Queue   │───▶│  Worker  │
//! │  (HTTP)  │    │(PENDING) │    │  (FIFO)  │    │(settle)  │
//! └──────────┘    └──────────┘    └──────────┘    └──────────┘
//! ```
//!
//! Usage: `money_transfer [--env dev] [--port 8080]`

use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};

use money_transfer::account::PgBalanceStore;
use money_transfer::config::AppConfig;
use money_transfer::{Database, MemoryStore, StoreError, TransferApp, gateway, logging};

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

async fn build_postgres_app(config: &AppConfig, url: &str) -> anyhow::Result<TransferApp> {
    let db = Database::connect(url)
        .await
        .context("Failed to connect to PostgreSQL")?;
    db.init_schema()
        .await
        .context("Failed to initialize schema")?;

    let users = PgBalanceStore::new(db.pool().clone());
    for seed in &config.seed_users {
        let user = seed.to_user();
        match users.create_user(&user).await {
            Ok(()) => info!(user_id = %user.id, name = %user.full_name(), email = %user.email, "Seeded user"),
            // Usually the email is already taken from an earlier start
            Err(StoreError::Database(e)) => {
                warn!(email = %user.email, error = %e, "Seed user skipped")
            }
            Err(e) => return Err(e).context("Failed to seed users"),
        }
    }

    info!("Using PostgreSQL stores");
    Ok(TransferApp::postgres(Arc::new(db), &config.settlement))
}

fn build_memory_app(config: &AppConfig) -> anyhow::Result<TransferApp> {
    warn!("No postgres_url configured, using in-memory store (data is lost on exit)");

    let store = Arc::new(MemoryStore::new());
    for seed in &config.seed_users {
        let user = seed.to_user();
        info!(user_id = %user.id, name = %user.full_name(), email = %user.email, "Seeded user");
        store.insert_user(user).context("Failed to seed users")?;
    }
    Ok(TransferApp::in_memory(store, &config.settlement))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let mut config = AppConfig::load(&env)?;
    if let Some(port) = get_port_override() {
        config.gateway.port = port;
    }
    let _log_guard = logging::init_logging(&config);

    info!(env = %env, version = env!("GIT_HASH"), "Starting money transfer service");

    let mut app = match config.postgres_url.clone() {
        Some(url) => build_postgres_app(&config, &url).await?,
        None => build_memory_app(&config)?,
    };

    let state = app.gateway_state()?;
    app.start()?;

    let served = gateway::run_server(&config.gateway, state, shutdown_signal()).await;

    // Let the in-flight job finish even when the server failed
    app.stop().await;
    served
}
