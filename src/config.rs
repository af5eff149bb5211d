use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;
use uuid::Uuid;

use crate::account::User;
use rust_decimal::Decimal;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub settlement: SettlementConfig,
    /// PostgreSQL connection URL. Without it the service runs on the in-memory store.
    #[serde(default)]
    pub postgres_url: Option<String>,
    /// Users created at startup when missing
    #[serde(default)]
    pub seed_users: Vec<SeedUser>,
}

/// Startup user entry; a fixed `id` keeps the account stable across restarts
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SeedUser {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub balance: Decimal,
}

impl SeedUser {
    pub fn to_user(&self) -> User {
        let mut user = User::new(
            self.first_name.clone(),
            self.last_name.clone(),
            self.email.clone(),
            self.balance,
        );
        if let Some(id) = self.id {
            user.id = id;
        }
        user
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

/// Settlement worker configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SettlementConfig {
    /// Job queue capacity; 0 means unbounded
    pub queue_capacity: usize,
    /// Upper bound for every store call made by the worker
    pub step_timeout_ms: u64,
    /// Settle through the store's single-transaction path when available
    pub atomic: bool,
    /// PENDING transactions loaded per recovery page
    pub recovery_batch_size: usize,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            step_timeout_ms: 5000,
            atomic: true,
            recovery_batch_size: 100,
        }
    }
}

impl SettlementConfig {
    pub fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms)
    }
}

impl AppConfig {
    /// Load `config/{env}.yaml`. `POSTGRES_URL` overrides the file value.
    pub fn load(env: &str) -> anyhow::Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        let mut config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config yaml: {}", config_path))?;

        if let Ok(url) = std::env::var("POSTGRES_URL")
            && !url.is_empty()
        {
            config.postgres_url = Some(url);
        }

        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }
}
