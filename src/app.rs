//! Application context
//!
//! Wires stores, queue, services and the settlement worker together. Nothing
//! runs until [`TransferApp::start`]; [`TransferApp::stop`] lets the current
//! job finish and leaves queued ones PENDING for the next start.

use anyhow::Context;
use std::sync::Arc;
use tracing::info;

use crate::account::{BalanceStore, Database, PgBalanceStore, UserService};
use crate::config::SettlementConfig;
use crate::gateway::metrics::HttpMetrics;
use crate::gateway::state::AppState;
use crate::transfer::{
    AtomicSettlement, JobReceiver, Ledger, MemoryStore, PgAtomicSettlement, PgLedger,
    SettlementWorker, TransferService, WorkerConfig, WorkerHandle, job_queue,
};

pub struct TransferApp {
    transfers: Arc<TransferService>,
    users: Arc<UserService>,
    database: Option<Arc<Database>>,
    /// Present until started
    pending_start: Option<(SettlementWorker, JobReceiver)>,
    worker: Option<WorkerHandle>,
}

impl TransferApp {
    /// Everything on one in-memory store
    pub fn in_memory(store: Arc<MemoryStore>, config: &SettlementConfig) -> Self {
        Self::assemble(store.clone(), store.clone(), store, config, None)
    }

    /// PostgreSQL-backed stores sharing one pool
    pub fn postgres(db: Arc<Database>, config: &SettlementConfig) -> Self {
        let pool = db.pool().clone();
        Self::assemble(
            Arc::new(PgBalanceStore::new(pool.clone())),
            Arc::new(PgLedger::new(pool.clone())),
            Arc::new(PgAtomicSettlement::new(pool)),
            config,
            Some(db),
        )
    }

    fn assemble(
        balances: Arc<dyn BalanceStore>,
        ledger: Arc<dyn Ledger>,
        atomic: Arc<dyn AtomicSettlement>,
        config: &SettlementConfig,
        database: Option<Arc<Database>>,
    ) -> Self {
        let (jobs, rx) = job_queue(config.queue_capacity);

        let mut worker =
            SettlementWorker::new(balances.clone(), ledger.clone(), WorkerConfig::from(config));
        if config.atomic {
            worker = worker.with_atomic(atomic);
        }

        Self {
            transfers: Arc::new(TransferService::new(ledger, jobs)),
            users: Arc::new(UserService::new(balances)),
            database,
            pending_start: Some((worker, rx)),
            worker: None,
        }
    }

    /// Spawn the settlement worker. Must run inside a tokio runtime; an app
    /// starts at most once.
    pub fn start(&mut self) -> anyhow::Result<()> {
        let (worker, rx) = self
            .pending_start
            .take()
            .ok_or_else(|| anyhow::anyhow!("settlement worker already started"))?;

        info!(atomic = worker.is_atomic(), "Starting transfer app");
        self.worker = Some(worker.spawn(rx));
        Ok(())
    }

    /// Stop the worker and wait for it. No-op when not running.
    pub async fn stop(&mut self) {
        if let Some(handle) = self.worker.take() {
            handle.stop().await;
            info!("Transfer app stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn transfers(&self) -> Arc<TransferService> {
        self.transfers.clone()
    }

    pub fn users(&self) -> Arc<UserService> {
        self.users.clone()
    }

    /// Shared state for the HTTP gateway
    pub fn gateway_state(&self) -> anyhow::Result<Arc<AppState>> {
        let metrics = HttpMetrics::new().context("Failed to register HTTP metrics")?;
        let state = AppState::new(self.transfers.clone(), self.users.clone(), Arc::new(metrics));
        Ok(Arc::new(match &self.database {
            Some(db) => state.with_database(db.clone()),
            None => state,
        }))
    }
}
