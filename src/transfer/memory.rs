//! In-memory store
//!
//! Implements [`BalanceStore`], [`Ledger`] and [`AtomicSettlement`] behind a
//! single mutex. Used when no PostgreSQL URL is configured, and in tests.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::db::Ledger;
use super::error::TransferError;
use super::settlement::AtomicSettlement;
use super::state::TransactionStatus;
use super::types::{SettlementJob, Transaction, TransactionId};
use crate::account::{BalanceStore, User, UserId};
use crate::db::StoreError;

#[derive(Default)]
struct MemoryState {
    users: HashMap<UserId, User>,
    /// Insertion order doubles as creation order
    transactions: Vec<Transaction>,
}

impl MemoryState {
    fn transaction_mut(&mut self, tx_id: TransactionId) -> Option<&mut Transaction> {
        self.transactions.iter_mut().find(|t| t.id == tx_id)
    }

    fn balance(&self, user_id: UserId) -> Result<Decimal, StoreError> {
        self.users
            .get(&user_id)
            .map(|u| u.balance)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user_id)))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let store = Self::new();
        if let Ok(mut state) = store.state.lock() {
            for user in users {
                state.users.insert(user.id, user);
            }
        }
        store
    }

    /// Add or replace a user
    pub fn insert_user(&self, user: User) -> Result<(), StoreError> {
        self.state()?.users.insert(user.id, user);
        Ok(())
    }

    /// Number of recorded transactions
    pub fn transaction_count(&self) -> usize {
        self.state().map(|s| s.transactions.len()).unwrap_or(0)
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Database("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl BalanceStore for MemoryStore {
    async fn get_balance(&self, user_id: UserId) -> Result<Decimal, StoreError> {
        self.state()?.balance(user_id)
    }

    async fn update_balance(
        &self,
        user_id: UserId,
        new_balance: Decimal,
    ) -> Result<(), StoreError> {
        let mut state = self.state()?;
        let user = state
            .users
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user_id)))?;
        user.balance = new_balance;
        Ok(())
    }

    async fn get_user_by_id(&self, user_id: UserId) -> Result<User, StoreError> {
        self.state()?
            .users
            .get(&user_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user_id)))
    }
}

#[async_trait]
impl Ledger for MemoryStore {
    async fn create_transaction(&self, tx: &Transaction) -> Result<(), StoreError> {
        let mut state = self.state()?;
        if state.transactions.iter().any(|t| t.id == tx.id) {
            return Err(StoreError::Conflict(format!("transaction {} exists", tx.id)));
        }
        state.transactions.push(tx.clone());
        Ok(())
    }

    async fn get_transactions_by_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Transaction>, StoreError> {
        let state = self.state()?;
        Ok(state
            .transactions
            .iter()
            .rev()
            .filter(|t| t.involves(user_id))
            .cloned()
            .collect())
    }

    async fn update_transaction_status(
        &self,
        tx_id: TransactionId,
        status: TransactionStatus,
    ) -> Result<(), StoreError> {
        let mut state = self.state()?;
        let tx = state
            .transaction_mut(tx_id)
            .ok_or_else(|| StoreError::NotFound(format!("transaction {}", tx_id)))?;

        if !tx.status.can_transition_to(status) {
            return Err(StoreError::Conflict(format!(
                "transaction {} is {}, cannot move to {}",
                tx_id, tx.status, status
            )));
        }
        tx.status = status;
        Ok(())
    }

    async fn get_transaction(
        &self,
        tx_id: TransactionId,
    ) -> Result<Option<Transaction>, StoreError> {
        Ok(self
            .state()?
            .transactions
            .iter()
            .find(|t| t.id == tx_id)
            .cloned())
    }

    async fn find_pending(&self, limit: usize) -> Result<Vec<Transaction>, StoreError> {
        Ok(self
            .state()?
            .transactions
            .iter()
            .filter(|t| t.status == TransactionStatus::Pending)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AtomicSettlement for MemoryStore {
    async fn settle(&self, job: &SettlementJob) -> Result<(), TransferError> {
        let mut state = self
            .state()
            .map_err(|e| TransferError::Database(e.to_string()))?;

        match state.transaction_mut(job.transaction_id) {
            None => {
                return Err(TransferError::TransactionNotFound(
                    job.transaction_id.to_string(),
                ));
            }
            Some(tx) if tx.status != TransactionStatus::Pending => {
                return Err(TransferError::AlreadyFinalized);
            }
            Some(_) => {}
        }

        let sender_balance = state
            .balance(job.sender_id)
            .map_err(|e| TransferError::BalanceRead(e.to_string()))?;
        if sender_balance < job.amount {
            return Err(TransferError::InsufficientFunds);
        }
        let receiver_balance = state
            .balance(job.receiver_id)
            .map_err(|e| TransferError::BalanceRead(e.to_string()))?;

        let (debited, credited) = job.moved_balances(sender_balance, receiver_balance)?;

        // Everything is validated; the writes below cannot fail under the lock
        if let Some(sender) = state.users.get_mut(&job.sender_id) {
            sender.balance = debited;
        }
        if let Some(receiver) = state.users.get_mut(&job.receiver_id) {
            receiver.balance = credited;
        }
        if let Some(tx) = state.transaction_mut(job.transaction_id) {
            tx.status = TransactionStatus::Success;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_users(a: i64, b: i64) -> (MemoryStore, User, User) {
        let alice = User::new("Alice", "A", "alice@example.com", Decimal::from(a));
        let bob = User::new("Bob", "B", "bob@example.com", Decimal::from(b));
        let store = MemoryStore::with_users([alice.clone(), bob.clone()]);
        (store, alice, bob)
    }

    #[tokio::test]
    async fn test_balance_read_write() {
        let (store, alice, _) = two_users(100, 50);
        assert_eq!(store.get_balance(alice.id).await.unwrap(), Decimal::from(100));
        store.update_balance(alice.id, Decimal::from(7)).await.unwrap();
        assert_eq!(store.get_balance(alice.id).await.unwrap(), Decimal::from(7));

        let missing = uuid::Uuid::new_v4();
        assert!(matches!(
            store.get_balance(missing).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_status_update_is_one_way() {
        let (store, alice, bob) = two_users(100, 50);
        let tx = Transaction::pending(alice.id, bob.id, Decimal::from(10));
        store.create_transaction(&tx).await.unwrap();

        store
            .update_transaction_status(tx.id, TransactionStatus::Failed)
            .await
            .unwrap();
        let again = store
            .update_transaction_status(tx.id, TransactionStatus::Success)
            .await;
        assert!(matches!(again, Err(StoreError::Conflict(_))));

        let missing = store
            .update_transaction_status(TransactionId::new(), TransactionStatus::Success)
            .await;
        assert!(matches!(missing, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_history_newest_first_and_pending_oldest_first() {
        let (store, alice, bob) = two_users(100, 50);
        let first = Transaction::pending(alice.id, bob.id, Decimal::from(1));
        let second = Transaction::pending(bob.id, alice.id, Decimal::from(2));
        store.create_transaction(&first).await.unwrap();
        store.create_transaction(&second).await.unwrap();

        let history = store.get_transactions_by_user(alice.id).await.unwrap();
        assert_eq!(history.iter().map(|t| t.id).collect::<Vec<_>>(), vec![second.id, first.id]);

        let pending = store.find_pending(10).await.unwrap();
        assert_eq!(pending.iter().map(|t| t.id).collect::<Vec<_>>(), vec![first.id, second.id]);
        assert_eq!(store.find_pending(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_atomic_settle_rejects_without_side_effects() {
        let (store, alice, bob) = two_users(50, 50);
        let tx = Transaction::pending(alice.id, bob.id, Decimal::from(80));
        store.create_transaction(&tx).await.unwrap();

        let result = store.settle(&SettlementJob::from(&tx)).await;
        assert_eq!(result, Err(TransferError::InsufficientFunds));
        assert_eq!(store.get_balance(alice.id).await.unwrap(), Decimal::from(50));
        assert_eq!(store.get_balance(bob.id).await.unwrap(), Decimal::from(50));
        let stored = store.get_transaction(tx.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TransactionStatus::Pending);
    }

    #[tokio::test]
    async fn test_atomic_settle_is_idempotent() {
        let (store, alice, bob) = two_users(100, 50);
        let tx = Transaction::pending(alice.id, bob.id, Decimal::from(80));
        store.create_transaction(&tx).await.unwrap();
        let job = SettlementJob::from(&tx);

        store.settle(&job).await.unwrap();
        assert_eq!(store.settle(&job).await, Err(TransferError::AlreadyFinalized));
        assert_eq!(store.get_balance(alice.id).await.unwrap(), Decimal::from(20));
        assert_eq!(store.get_balance(bob.id).await.unwrap(), Decimal::from(130));
    }
}
