//! HTTP handlers

pub mod account;
pub mod health;
pub mod transfer;

pub use account::{get_balance, get_user};
pub use health::{HealthResponse, health_check};
pub use transfer::{create_transfer, get_transaction, get_transfers};

// utoipa's generated path types live next to each handler
pub use account::{__path_get_balance, __path_get_user};
pub use health::__path_health_check;
pub use transfer::{__path_create_transfer, __path_get_transaction, __path_get_transfers};

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use crate::account::UserService;
    use crate::gateway::metrics::HttpMetrics;
    use crate::gateway::state::AppState;
    use crate::transfer::{JobReceiver, MemoryStore, TransferService, job_queue};

    /// Gateway state over an empty in-memory store, with no worker attached
    pub(crate) fn memory_state() -> (Arc<AppState>, Arc<MemoryStore>, JobReceiver) {
        let store = Arc::new(MemoryStore::new());
        let (jobs, rx) = job_queue(64);
        let transfers = Arc::new(TransferService::new(store.clone(), jobs));
        let users = Arc::new(UserService::new(store.clone()));
        let metrics = Arc::new(HttpMetrics::new().unwrap());
        (Arc::new(AppState::new(transfers, users, metrics)), store, rx)
    }
}
