//! Money Transfer Service
//!
//! Transfers between users are accepted synchronously and settled by a
//! single background worker.
//!
//! # Modules
//!
//! - [`account`] - Users, balance store contract, user queries
//! - [`transfer`] - Ledger, job queue, acceptance service, settlement worker
//! - [`app`] - Application context (wiring, start/stop)
//! - [`gateway`] - axum HTTP API and OpenAPI docs
//! - [`db`] - PostgreSQL pool and schema
//! - [`config`] - YAML configuration
//! - [`logging`] - tracing setup

pub mod account;
pub mod app;
pub mod config;
pub mod db;
pub mod gateway;
pub mod logging;
pub mod transfer;

// Convenient re-exports at crate root
pub use account::{BalanceStore, User, UserId, UserService};
pub use app::TransferApp;
pub use config::{AppConfig, SettlementConfig};
pub use db::{Database, StoreError};
pub use transfer::{
    Ledger, MemoryStore, SettlementJob, SettlementOutcome, SettlementWorker, Transaction,
    TransactionId, TransactionStatus, TransferError, TransferService, WorkerConfig,
};
