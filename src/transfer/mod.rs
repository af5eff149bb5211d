//! Money Transfer Pipeline
//!
//! Transfers are accepted synchronously and settled asynchronously.
//!
//! # Flow
//!
//! ```text
//! create_transfer ─► ledger: PENDING ─► job queue ─► SettlementWorker
//!                                                          │
//!                                     balances moved ─► SUCCESS
//!                                     any step fails ─► FAILED
//! ```
//!
//! # Invariants
//!
//! 1. **PENDING First**: a transaction is recorded before its job is queued;
//!    the record survives a lost job and is settled by the recovery scan
//! 2. **One Way**: PENDING moves to SUCCESS or FAILED exactly once, enforced
//!    by the ledger with a compare-and-set
//! 3. **Serial Settlement**: one worker, one job at a time, FIFO
//! 4. **Conservation**: in atomic mode (default) both balance writes and the
//!    status write commit together; stepwise mode can leave a sender debited
//!    when the receiver credit fails

pub mod db;
pub mod error;
pub mod memory;
#[cfg(test)]
mod mock;
pub mod queue;
pub mod service;
pub mod settlement;
pub mod state;
pub mod types;
pub mod worker;


// Re-exports for convenience
pub use db::{Ledger, PgLedger};
pub use error::TransferError;
pub use memory::MemoryStore;
pub use queue::{JobReceiver, JobSender, job_queue};
pub use service::TransferService;
pub use settlement::{AtomicSettlement, PgAtomicSettlement};
pub use state::TransactionStatus;
pub use types::{SettlementJob, SettlementOutcome, Transaction, TransactionId};
pub use worker::{SettlementWorker, WorkerConfig, WorkerHandle};
