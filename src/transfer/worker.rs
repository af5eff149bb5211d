//! Settlement Worker
//!
//! Single background consumer of the job queue. Jobs run one at a time,
//! system-wide: no two settlements ever touch balances concurrently, which is
//! what keeps balance updates race-free without row locks in stepwise mode.
//!
//! On start the worker first settles PENDING transactions left in the ledger
//! (jobs lost with a previous process), then drains the queue.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::db::Ledger;
use super::error::TransferError;
use super::queue::JobReceiver;
use super::settlement::AtomicSettlement;
use super::state::TransactionStatus;
use super::types::{SettlementJob, SettlementOutcome, TransactionId, validate_amount};
use crate::account::BalanceStore;
use crate::config::SettlementConfig;
use crate::db::StoreError;

/// Configuration for the settlement worker
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Upper bound for each store call; exceeding it fails the job
    pub step_timeout: Duration,
    /// PENDING transactions loaded per recovery page
    pub recovery_batch_size: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            step_timeout: Duration::from_secs(5),
            recovery_batch_size: 100,
        }
    }
}

impl From<&SettlementConfig> for WorkerConfig {
    fn from(config: &SettlementConfig) -> Self {
        Self {
            step_timeout: config.step_timeout(),
            recovery_batch_size: config.recovery_batch_size.max(1),
        }
    }
}

pub struct SettlementWorker {
    balances: Arc<dyn BalanceStore>,
    ledger: Arc<dyn Ledger>,
    atomic: Option<Arc<dyn AtomicSettlement>>,
    config: WorkerConfig,
}

impl SettlementWorker {
    /// Stepwise worker: four balance calls then a status write
    pub fn new(
        balances: Arc<dyn BalanceStore>,
        ledger: Arc<dyn Ledger>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            balances,
            ledger,
            atomic: None,
            config,
        }
    }

    /// Settle through a single all-or-nothing call instead of separate writes
    pub fn with_atomic(mut self, atomic: Arc<dyn AtomicSettlement>) -> Self {
        self.atomic = Some(atomic);
        self
    }

    pub fn is_atomic(&self) -> bool {
        self.atomic.is_some()
    }

    /// Start the worker on its own task
    pub fn spawn(self, jobs: JobReceiver) -> WorkerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(self.run(jobs, shutdown_rx));
        WorkerHandle {
            shutdown: shutdown_tx,
            join,
        }
    }

    /// Worker loop: recovery scan, then one job at a time until shutdown.
    ///
    /// Shutdown is only observed between jobs; a job in progress always
    /// runs to completion.
    pub async fn run(self, mut jobs: JobReceiver, mut shutdown: watch::Receiver<bool>) {
        info!(
            atomic = self.is_atomic(),
            step_timeout_ms = self.config.step_timeout.as_millis() as u64,
            "Starting settlement worker"
        );

        match self.recover_pending().await {
            Ok(0) => debug!("No pending transactions to recover"),
            Ok(count) => info!(count = count, "Recovered pending transactions"),
            Err(e) => error!(error = %e, "Recovery scan failed"),
        }

        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                job = jobs.recv() => match job {
                    Some(job) => self.handle(job).await,
                    None => break,
                },
            }
        }

        jobs.close();
        info!(
            remaining = jobs.len(),
            "Settlement worker stopped, queued jobs stay PENDING until next start"
        );
    }

    /// Settle every PENDING transaction currently in the ledger, oldest first
    pub async fn recover_pending(&self) -> Result<usize, TransferError> {
        let mut seen: HashSet<TransactionId> = HashSet::new();
        let mut recovered = 0;

        loop {
            let batch = match tokio::time::timeout(
                self.config.step_timeout,
                self.ledger.find_pending(self.config.recovery_batch_size),
            )
            .await
            {
                Ok(Ok(batch)) => batch,
                Ok(Err(e)) => return Err(TransferError::Database(e.to_string())),
                Err(_) => return Err(TransferError::Timeout("find pending".to_string())),
            };

            // Transactions whose status write keeps failing come back; stop on them
            let fresh: Vec<_> = batch.into_iter().filter(|tx| seen.insert(tx.id)).collect();
            if fresh.is_empty() {
                break;
            }

            for tx in fresh {
                debug!(transaction_id = %tx.id, "Recovering pending transaction");
                self.handle(SettlementJob::from(&tx)).await;
                recovered += 1;
            }
        }

        Ok(recovered)
    }

    /// Run one job and log its outcome
    async fn handle(&self, job: SettlementJob) {
        if !self.should_process(&job).await {
            return;
        }

        match self.process_job(&job).await {
            Ok(SettlementOutcome::Settled) => {}
            Ok(SettlementOutcome::Rejected(reason)) => {
                warn!(
                    transaction_id = %job.transaction_id,
                    reason = %reason,
                    "Transfer marked FAILED"
                );
            }
            Err(TransferError::AlreadyFinalized) => {
                debug!(transaction_id = %job.transaction_id, "Transaction already finalized");
            }
            Err(e) => {
                error!(transaction_id = %job.transaction_id, error = %e, "Failed to process job");
            }
        }
    }

    /// Skip jobs whose transaction is gone or already terminal
    async fn should_process(&self, job: &SettlementJob) -> bool {
        let lookup = tokio::time::timeout(
            self.config.step_timeout,
            self.ledger.get_transaction(job.transaction_id),
        )
        .await;

        match lookup {
            Ok(Ok(Some(tx))) if tx.status.is_terminal() => {
                debug!(
                    transaction_id = %job.transaction_id,
                    status = %tx.status,
                    "Skipping job for finalized transaction"
                );
                false
            }
            Ok(Ok(Some(_))) => true,
            Ok(Ok(None)) => {
                warn!(transaction_id = %job.transaction_id, "Transaction not in ledger, dropping job");
                false
            }
            Ok(Err(e)) => {
                warn!(transaction_id = %job.transaction_id, error = %e, "Status pre-check failed");
                true
            }
            Err(_) => {
                warn!(transaction_id = %job.transaction_id, "Status pre-check timed out");
                true
            }
        }
    }

    /// Settle one job.
    ///
    /// `Ok` means the final status write went through, either SUCCESS
    /// ([`SettlementOutcome::Settled`]) or FAILED with the reason
    /// ([`SettlementOutcome::Rejected`]). `Err` means the status write itself
    /// failed; balance writes already made are not rolled back.
    pub async fn process_job(
        &self,
        job: &SettlementJob,
    ) -> Result<SettlementOutcome, TransferError> {
        // Unreachable through the acceptance path, checked again for replayed jobs
        if let Err(e) = validate_amount(job.amount) {
            error!(transaction_id = %job.transaction_id, amount = %job.amount, "Invalid settlement amount");
            return self.mark_failed(job, e).await;
        }
        if job.sender_id == job.receiver_id {
            error!(transaction_id = %job.transaction_id, "Sender and receiver are the same account");
            return self.mark_failed(job, TransferError::SameAccount).await;
        }

        match &self.atomic {
            Some(atomic) => self.settle_atomic(job, atomic.as_ref()).await,
            None => self.settle_stepwise(job).await,
        }
    }

    async fn settle_stepwise(
        &self,
        job: &SettlementJob,
    ) -> Result<SettlementOutcome, TransferError> {
        let sender_balance = match self
            .bounded(
                "read sender balance",
                self.balances.get_balance(job.sender_id),
                TransferError::BalanceRead,
            )
            .await
        {
            Ok(balance) => balance,
            Err(e) => {
                error!(transaction_id = %job.transaction_id, error = %e, "Failed to get sender balance");
                return self.mark_failed(job, e).await;
            }
        };

        if sender_balance < job.amount {
            warn!(
                transaction_id = %job.transaction_id,
                balance = %sender_balance,
                amount = %job.amount,
                "Insufficient funds"
            );
            return self.mark_failed(job, TransferError::InsufficientFunds).await;
        }

        let receiver_balance = match self
            .bounded(
                "read receiver balance",
                self.balances.get_balance(job.receiver_id),
                TransferError::BalanceRead,
            )
            .await
        {
            Ok(balance) => balance,
            Err(e) => {
                error!(transaction_id = %job.transaction_id, error = %e, "Failed to get receiver balance");
                return self.mark_failed(job, e).await;
            }
        };

        let (debited, credited) = match job.moved_balances(sender_balance, receiver_balance) {
            Ok(balances) => balances,
            Err(e) => {
                error!(transaction_id = %job.transaction_id, error = %e, "Balance out of range");
                return self.mark_failed(job, e).await;
            }
        };

        if let Err(e) = self
            .bounded(
                "debit sender",
                self.balances.update_balance(job.sender_id, debited),
                TransferError::BalanceWrite,
            )
            .await
        {
            error!(transaction_id = %job.transaction_id, error = %e, "Failed to update sender balance");
            return self.mark_failed(job, e).await;
        }

        if let Err(e) = self
            .bounded(
                "credit receiver",
                self.balances.update_balance(job.receiver_id, credited),
                TransferError::BalanceWrite,
            )
            .await
        {
            // Sender stays debited: the two writes are not one unit in stepwise mode
            error!(
                transaction_id = %job.transaction_id,
                sender_id = %job.sender_id,
                amount = %job.amount,
                error = %e,
                "Failed to update receiver balance after sender was debited"
            );
            return self.mark_failed(job, e).await;
        }

        if let Err(e) = self
            .write_status(job.transaction_id, TransactionStatus::Success)
            .await
        {
            error!(transaction_id = %job.transaction_id, error = %e, "Failed to update transaction status");
            return Err(e);
        }

        info!(transaction_id = %job.transaction_id, amount = %job.amount, "Transfer completed");
        Ok(SettlementOutcome::Settled)
    }

    async fn settle_atomic(
        &self,
        job: &SettlementJob,
        atomic: &dyn AtomicSettlement,
    ) -> Result<SettlementOutcome, TransferError> {
        match tokio::time::timeout(self.config.step_timeout, atomic.settle(job)).await {
            Ok(Ok(())) => {
                info!(transaction_id = %job.transaction_id, amount = %job.amount, "Transfer completed");
                Ok(SettlementOutcome::Settled)
            }
            Ok(Err(TransferError::AlreadyFinalized)) => Err(TransferError::AlreadyFinalized),
            Ok(Err(e)) => {
                warn!(transaction_id = %job.transaction_id, error = %e, "Atomic settlement rejected");
                self.mark_failed(job, e).await
            }
            Err(_) => {
                error!(transaction_id = %job.transaction_id, "Atomic settlement timed out");
                self.mark_failed(job, TransferError::Timeout("atomic settlement".to_string()))
                    .await
            }
        }
    }

    /// Record FAILED; the reason is kept in the outcome and the logs
    async fn mark_failed(
        &self,
        job: &SettlementJob,
        reason: TransferError,
    ) -> Result<SettlementOutcome, TransferError> {
        match self
            .write_status(job.transaction_id, TransactionStatus::Failed)
            .await
        {
            Ok(()) => Ok(SettlementOutcome::Rejected(reason)),
            Err(e) => {
                error!(
                    transaction_id = %job.transaction_id,
                    reason = %reason,
                    error = %e,
                    "Failed to mark transaction FAILED"
                );
                Err(e)
            }
        }
    }

    async fn write_status(
        &self,
        tx_id: TransactionId,
        status: TransactionStatus,
    ) -> Result<(), TransferError> {
        match tokio::time::timeout(
            self.config.step_timeout,
            self.ledger.update_transaction_status(tx_id, status),
        )
        .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(StoreError::Conflict(_))) => Err(TransferError::AlreadyFinalized),
            Ok(Err(e)) => Err(TransferError::StatusUpdate(e.to_string())),
            Err(_) => Err(TransferError::StatusUpdate(format!(
                "timed out after {:?}",
                self.config.step_timeout
            ))),
        }
    }

    /// Run a store call under the step timeout
    async fn bounded<T, F>(
        &self,
        step: &str,
        fut: F,
        on_error: fn(String) -> TransferError,
    ) -> Result<T, TransferError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.config.step_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(on_error(e.to_string())),
            Err(_) => Err(TransferError::Timeout(step.to_string())),
        }
    }
}

/// Running worker task
pub struct WorkerHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Signal shutdown, let the current job finish, wait for the task
    pub async fn stop(self) {
        // Err only if the worker already exited
        let _ = self.shutdown.send(true);
        if let Err(e) = self.join.await {
            error!(error = %e, "Settlement worker task failed");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}
