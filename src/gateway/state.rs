use std::sync::Arc;

use super::metrics::HttpMetrics;
use crate::account::{Database, UserService};
use crate::transfer::TransferService;

/// Gateway shared state
#[derive(Clone)]
pub struct AppState {
    /// Transfer acceptance and history
    pub transfers: Arc<TransferService>,
    /// Balance and profile lookups
    pub users: Arc<UserService>,
    /// PostgreSQL, pinged by the health check (None in memory mode)
    pub pg_db: Option<Arc<Database>>,
    /// Request counters served at `/metrics`
    pub metrics: Arc<HttpMetrics>,
}

impl AppState {
    pub fn new(
        transfers: Arc<TransferService>,
        users: Arc<UserService>,
        metrics: Arc<HttpMetrics>,
    ) -> Self {
        Self {
            transfers,
            users,
            pg_db: None,
            metrics,
        }
    }

    pub fn with_database(mut self, db: Arc<Database>) -> Self {
        self.pg_db = Some(db);
        self
    }
}
