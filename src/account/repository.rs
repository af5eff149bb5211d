//! Balance store contract and its PostgreSQL implementation

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};

use super::models::{User, UserId};
use crate::db::StoreError;

/// Per-user balance storage
///
/// The settlement worker is the only writer; reads are also served to the
/// balance endpoint through [`super::UserService`].
#[async_trait]
pub trait BalanceStore: Send + Sync {
    async fn get_balance(&self, user_id: UserId) -> Result<Decimal, StoreError>;

    /// Overwrite the balance with an already computed value
    async fn update_balance(&self, user_id: UserId, new_balance: Decimal)
    -> Result<(), StoreError>;

    async fn get_user_by_id(&self, user_id: UserId) -> Result<User, StoreError>;
}

/// `users` table access
pub struct PgBalanceStore {
    pool: PgPool,
}

impl PgBalanceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a user row (seeding and tests)
    pub async fn create_user(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO users (id, first_name, last_name, email, balance)
               VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(user.balance)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl BalanceStore for PgBalanceStore {
    async fn get_balance(&self, user_id: UserId) -> Result<Decimal, StoreError> {
        let row = sqlx::query("SELECT balance FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user_id)))?;

        Ok(row.try_get("balance")?)
    }

    async fn update_balance(
        &self,
        user_id: UserId,
        new_balance: Decimal,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET balance = $1 WHERE id = $2")
            .bind(new_balance)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("user {}", user_id)));
        }
        Ok(())
    }

    async fn get_user_by_id(&self, user_id: UserId) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"SELECT id, first_name, last_name, email, balance
               FROM users WHERE id = $1"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("user {}", user_id)))
    }
}
