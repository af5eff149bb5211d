//! Transfer Acceptance Service
//!
//! Validates a transfer request, records it as PENDING and hands a
//! settlement job to the worker. Returns before settlement happens, so a
//! caller reading history right after creation may still see PENDING.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::db::Ledger;
use super::error::TransferError;
use super::queue::JobSender;
use super::types::{SettlementJob, Transaction, TransactionId, validate_amount};
use crate::account::UserId;
use crate::db::StoreError;

pub struct TransferService {
    ledger: Arc<dyn Ledger>,
    jobs: JobSender,
}

impl TransferService {
    pub fn new(ledger: Arc<dyn Ledger>, jobs: JobSender) -> Self {
        Self { ledger, jobs }
    }

    /// False once the settlement worker has released the queue
    pub fn settlement_available(&self) -> bool {
        !self.jobs.is_closed()
    }

    /// Accept a transfer: validate, persist PENDING, enqueue settlement
    pub async fn create_transfer(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
        amount: Decimal,
    ) -> Result<TransactionId, TransferError> {
        if let Err(e) = validate_amount(amount) {
            warn!(
                amount = %amount,
                from = %sender_id,
                to = %receiver_id,
                "Invalid transfer amount"
            );
            return Err(e);
        }

        if sender_id == receiver_id {
            warn!(user_id = %sender_id, "Transfer to same account rejected");
            return Err(TransferError::SameAccount);
        }

        let tx = Transaction::pending(sender_id, receiver_id, amount);

        if let Err(e) = self.ledger.create_transaction(&tx).await {
            error!(transaction_id = %tx.id, error = %e, "Failed to create transfer");
            return Err(TransferError::TransactionPersist(e.to_string()));
        }

        info!(
            transaction_id = %tx.id,
            from = %tx.sender_id,
            to = %tx.receiver_id,
            amount = %tx.amount,
            "Transfer created"
        );

        let job = SettlementJob::from(&tx);
        if let Err(e) = self.jobs.enqueue(job).await {
            // The PENDING record is the source of truth; startup recovery picks it up
            warn!(
                transaction_id = %tx.id,
                error = %e,
                "Settlement queue unavailable, transfer left PENDING for recovery"
            );
        }

        Ok(tx.id)
    }

    /// Transactions where the user is sender or receiver
    pub async fn get_transactions_by_user_id(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Transaction>, TransferError> {
        let transactions = self
            .ledger
            .get_transactions_by_user(user_id)
            .await
            .map_err(|e| {
                error!(user_id = %user_id, error = %e, "Failed to get transactions by user id");
                TransferError::Database(e.to_string())
            })?;

        info!(user_id = %user_id, count = transactions.len(), "Transactions retrieved");
        Ok(transactions)
    }

    /// Single transaction lookup, for status polling
    pub async fn get_transaction(&self, tx_id: TransactionId) -> Result<Transaction, TransferError> {
        match self.ledger.get_transaction(tx_id).await {
            Ok(Some(tx)) => Ok(tx),
            Ok(None) | Err(StoreError::NotFound(_)) => {
                Err(TransferError::TransactionNotFound(tx_id.to_string()))
            }
            Err(e) => {
                error!(transaction_id = %tx_id, error = %e, "Failed to get transaction");
                Err(TransferError::Database(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::memory::MemoryStore;
    use crate::transfer::mock::FaultyLedger;
    use crate::transfer::queue::job_queue;
    use crate::transfer::state::TransactionStatus;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_invalid_amount_has_no_side_effects() {
        let store = Arc::new(MemoryStore::new());
        let (jobs, mut rx) = job_queue(8);
        let service = TransferService::new(store.clone(), jobs);

        for amount in [Decimal::ZERO, Decimal::from(-5), Decimal::new(-1, 2)] {
            let result = service
                .create_transfer(Uuid::new_v4(), Uuid::new_v4(), amount)
                .await;
            assert_eq!(result, Err(TransferError::InvalidAmount));
        }

        assert_eq!(store.transaction_count(), 0);
        assert!(rx.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_amount_beyond_column_precision_rejected() {
        let store = Arc::new(MemoryStore::new());
        let (jobs, mut rx) = job_queue(8);
        let service = TransferService::new(store.clone(), jobs);

        // NUMERIC(20, 8) would round these: 5e-9 up on the receiver, 4e-9 to zero
        let too_fine = [Decimal::new(5, 9), Decimal::new(4, 9), Decimal::new(100_000_001, 9)];
        let too_large = Decimal::from(1_000_000_000_000_i64);
        for amount in too_fine.into_iter().chain([too_large]) {
            let result = service
                .create_transfer(Uuid::new_v4(), Uuid::new_v4(), amount)
                .await;
            assert_eq!(result, Err(TransferError::InvalidAmount), "amount {amount}");
        }

        assert_eq!(store.transaction_count(), 0);
        assert!(rx.try_recv().is_none());

        // Eight places and trailing zeros are fine
        for amount in [Decimal::new(1, 8), Decimal::new(1_500_000_000, 9)] {
            assert!(
                service
                    .create_transfer(Uuid::new_v4(), Uuid::new_v4(), amount)
                    .await
                    .is_ok()
            );
        }
        assert_eq!(store.transaction_count(), 2);
    }

    #[tokio::test]
    async fn test_same_account_rejected() {
        let store = Arc::new(MemoryStore::new());
        let (jobs, mut rx) = job_queue(8);
        let service = TransferService::new(store.clone(), jobs);

        let user = Uuid::new_v4();
        let result = service.create_transfer(user, user, Decimal::from(10)).await;
        assert_eq!(result, Err(TransferError::SameAccount));
        assert_eq!(store.transaction_count(), 0);
        assert!(rx.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_persist_failure_does_not_enqueue() {
        let ledger = Arc::new(FaultyLedger::new());
        ledger.set_fail_create(true);
        let (jobs, mut rx) = job_queue(8);
        let service = TransferService::new(ledger, jobs);

        let result = service
            .create_transfer(Uuid::new_v4(), Uuid::new_v4(), Decimal::from(100))
            .await;
        assert!(matches!(result, Err(TransferError::TransactionPersist(_))));
        assert!(rx.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_success_records_pending_and_enqueues_job() {
        let store = Arc::new(MemoryStore::new());
        let (jobs, mut rx) = job_queue(8);
        let service = TransferService::new(store.clone(), jobs);

        let from = Uuid::new_v4();
        let to = Uuid::new_v4();
        let id = service
            .create_transfer(from, to, Decimal::from(100))
            .await
            .unwrap();

        let job = rx.try_recv().expect("expected job in queue");
        assert_eq!(job.sender_id, from);
        assert_eq!(job.receiver_id, to);
        assert_eq!(job.amount, Decimal::from(100));
        assert_eq!(job.transaction_id, id);

        let recorded = service.get_transaction(id).await.unwrap();
        assert_eq!(recorded.status, TransactionStatus::Pending);
    }

    #[tokio::test]
    async fn test_closed_queue_still_returns_id() {
        let store = Arc::new(MemoryStore::new());
        let (jobs, rx) = job_queue(8);
        drop(rx);
        let service = TransferService::new(store.clone(), jobs);

        let id = service
            .create_transfer(Uuid::new_v4(), Uuid::new_v4(), Decimal::from(1))
            .await
            .unwrap();
        let pending = store.find_pending(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, id);
    }

    #[tokio::test]
    async fn test_history_pass_through() {
        let store = Arc::new(MemoryStore::new());
        let (jobs, _rx) = job_queue(8);
        let service = TransferService::new(store.clone(), jobs);

        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let carol = Uuid::new_v4();
        service.create_transfer(alice, bob, Decimal::from(1)).await.unwrap();
        service.create_transfer(carol, alice, Decimal::from(2)).await.unwrap();
        service.create_transfer(bob, carol, Decimal::from(3)).await.unwrap();

        let history = service.get_transactions_by_user_id(alice).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|t| t.involves(alice)));
    }

    #[tokio::test]
    async fn test_history_error_mapped() {
        let ledger = Arc::new(FaultyLedger::new());
        ledger.set_fail_reads(true);
        let (jobs, _rx) = job_queue(8);
        let service = TransferService::new(ledger, jobs);

        let result = service.get_transactions_by_user_id(Uuid::new_v4()).await;
        assert!(matches!(result, Err(TransferError::Database(_))));
    }

    #[tokio::test]
    async fn test_unknown_transaction_not_found() {
        let store = Arc::new(MemoryStore::new());
        let (jobs, _rx) = job_queue(8);
        let service = TransferService::new(store, jobs);

        let result = service.get_transaction(TransactionId::new()).await;
        assert!(matches!(result, Err(TransferError::TransactionNotFound(_))));
    }
}
