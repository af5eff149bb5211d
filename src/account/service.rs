//! Read-only user queries behind the balance and profile endpoints

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error};

use super::models::{User, UserId};
use super::repository::BalanceStore;
use crate::db::StoreError;
use crate::transfer::TransferError;

pub struct UserService {
    store: Arc<dyn BalanceStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn BalanceStore>) -> Self {
        Self { store }
    }

    pub async fn get_balance(&self, user_id: UserId) -> Result<Decimal, TransferError> {
        let balance = self
            .store
            .get_balance(user_id)
            .await
            .map_err(|e| Self::map_err(user_id, e))?;
        debug!(user_id = %user_id, balance = %balance, "Balance retrieved");
        Ok(balance)
    }

    pub async fn get_by_id(&self, user_id: UserId) -> Result<User, TransferError> {
        self.store
            .get_user_by_id(user_id)
            .await
            .map_err(|e| Self::map_err(user_id, e))
    }

    fn map_err(user_id: UserId, e: StoreError) -> TransferError {
        match e {
            StoreError::NotFound(_) => TransferError::UserNotFound(user_id.to_string()),
            other => {
                error!(user_id = %user_id, error = %other, "User lookup failed");
                TransferError::Database(other.to_string())
            }
        }
    }
}
