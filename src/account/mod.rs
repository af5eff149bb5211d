//! User accounts
//!
//! Per-user balance storage consumed by the settlement worker, plus the
//! read-only user service behind the balance and profile endpoints.

pub mod models;
pub mod repository;
pub mod service;

pub use models::{User, UserId};
pub use repository::{BalanceStore, PgBalanceStore};
pub use service::UserService;

// Re-export Database from top-level db module
pub use crate::db::Database;
