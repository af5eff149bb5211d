//! Fault-injecting store wrappers for tests
//!
//! All wrap a [`MemoryStore`] so unaffected calls behave normally.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::db::Ledger;
use super::error::TransferError;
use super::memory::MemoryStore;
use super::settlement::AtomicSettlement;
use super::state::TransactionStatus;
use super::types::{SettlementJob, Transaction, TransactionId};
use crate::account::{BalanceStore, User, UserId};
use crate::db::StoreError;

pub struct FaultyBalanceStore {
    inner: Arc<MemoryStore>,
    fail_read: Mutex<HashSet<UserId>>,
    fail_write: Mutex<HashSet<UserId>>,
    read_delay: Mutex<Option<Duration>>,
    write_count: AtomicUsize,
}

impl FaultyBalanceStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            fail_read: Mutex::new(HashSet::new()),
            fail_write: Mutex::new(HashSet::new()),
            read_delay: Mutex::new(None),
            write_count: AtomicUsize::new(0),
        }
    }

    pub fn fail_read_for(&self, user_id: UserId) {
        self.fail_read.lock().unwrap().insert(user_id);
    }

    pub fn fail_write_for(&self, user_id: UserId) {
        self.fail_write.lock().unwrap().insert(user_id);
    }

    /// Make every balance read sleep before answering
    pub fn set_read_delay(&self, delay: Duration) {
        *self.read_delay.lock().unwrap() = Some(delay);
    }

    pub fn write_count(&self) -> usize {
        self.write_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BalanceStore for FaultyBalanceStore {
    async fn get_balance(&self, user_id: UserId) -> Result<Decimal, StoreError> {
        let delay = *self.read_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_read.lock().unwrap().contains(&user_id) {
            return Err(StoreError::Database("mock read failure".to_string()));
        }
        self.inner.get_balance(user_id).await
    }

    async fn update_balance(
        &self,
        user_id: UserId,
        new_balance: Decimal,
    ) -> Result<(), StoreError> {
        self.write_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_write.lock().unwrap().contains(&user_id) {
            return Err(StoreError::Database("mock write failure".to_string()));
        }
        self.inner.update_balance(user_id, new_balance).await
    }

    async fn get_user_by_id(&self, user_id: UserId) -> Result<User, StoreError> {
        self.inner.get_user_by_id(user_id).await
    }
}

pub struct FaultyLedger {
    inner: Arc<MemoryStore>,
    fail_create: Mutex<bool>,
    fail_reads: Mutex<bool>,
    fail_status: Mutex<HashSet<TransactionStatus>>,
    status_updates: Mutex<Vec<(TransactionId, TransactionStatus)>>,
}

impl FaultyLedger {
    pub fn new() -> Self {
        Self::with_inner(Arc::new(MemoryStore::new()))
    }

    pub fn with_inner(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            fail_create: Mutex::new(false),
            fail_reads: Mutex::new(false),
            fail_status: Mutex::new(HashSet::new()),
            status_updates: Mutex::new(Vec::new()),
        }
    }

    pub fn set_fail_create(&self, fail: bool) {
        *self.fail_create.lock().unwrap() = fail;
    }

    pub fn set_fail_reads(&self, fail: bool) {
        *self.fail_reads.lock().unwrap() = fail;
    }

    /// Fail every attempt to write the given status
    pub fn fail_status(&self, status: TransactionStatus) {
        self.fail_status.lock().unwrap().insert(status);
    }

    /// Every status write attempted, in order, including failed ones
    pub fn status_updates(&self) -> Vec<(TransactionId, TransactionStatus)> {
        self.status_updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl Ledger for FaultyLedger {
    async fn create_transaction(&self, tx: &Transaction) -> Result<(), StoreError> {
        if *self.fail_create.lock().unwrap() {
            return Err(StoreError::Database("mock insert failure".to_string()));
        }
        self.inner.create_transaction(tx).await
    }

    async fn get_transactions_by_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Transaction>, StoreError> {
        if *self.fail_reads.lock().unwrap() {
            return Err(StoreError::Database("mock query failure".to_string()));
        }
        self.inner.get_transactions_by_user(user_id).await
    }

    async fn update_transaction_status(
        &self,
        tx_id: TransactionId,
        status: TransactionStatus,
    ) -> Result<(), StoreError> {
        self.status_updates.lock().unwrap().push((tx_id, status));
        if self.fail_status.lock().unwrap().contains(&status) {
            return Err(StoreError::Database("mock status failure".to_string()));
        }
        self.inner.update_transaction_status(tx_id, status).await
    }

    async fn get_transaction(
        &self,
        tx_id: TransactionId,
    ) -> Result<Option<Transaction>, StoreError> {
        if *self.fail_reads.lock().unwrap() {
            return Err(StoreError::Database("mock query failure".to_string()));
        }
        self.inner.get_transaction(tx_id).await
    }

    async fn find_pending(&self, limit: usize) -> Result<Vec<Transaction>, StoreError> {
        if *self.fail_reads.lock().unwrap() {
            return Err(StoreError::Database("mock query failure".to_string()));
        }
        self.inner.find_pending(limit).await
    }
}

/// Atomic settlement that can be told to roll back with a given error
pub struct FaultyAtomic {
    inner: Arc<MemoryStore>,
    fail_with: Mutex<Option<TransferError>>,
}

impl FaultyAtomic {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            fail_with: Mutex::new(None),
        }
    }

    /// Every `settle` fails with `error` and writes nothing
    pub fn fail_with(&self, error: TransferError) {
        *self.fail_with.lock().unwrap() = Some(error);
    }
}

#[async_trait]
impl AtomicSettlement for FaultyAtomic {
    async fn settle(&self, job: &SettlementJob) -> Result<(), TransferError> {
        let failure = self.fail_with.lock().unwrap().clone();
        match failure {
            Some(e) => Err(e),
            None => self.inner.settle(job).await,
        }
    }
}
