//! Data models for user accounts

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// User identifier
pub type UserId = Uuid;

/// User account with its current balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct User {
    #[schema(value_type = String, format = Uuid)]
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Never negative as a result of a transfer (checked before debit)
    #[schema(value_type = String, example = "100.00")]
    pub balance: Decimal,
}

impl User {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        balance: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            balance,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_gets_fresh_id() {
        let a = User::new("Ada", "Lovelace", "ada@example.com", Decimal::from(10));
        let b = User::new("Ada", "Lovelace", "ada@example.com", Decimal::from(10));
        assert_ne!(a.id, b.id);
        assert_eq!(a.full_name(), "Ada Lovelace");
    }

    #[test]
    fn test_balance_serializes_as_string() {
        let user = User::new("Alan", "Turing", "alan@example.com", Decimal::new(4250, 2));
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["balance"], "42.50");
        assert_eq!(json["email"], "alan@example.com");
    }
}
