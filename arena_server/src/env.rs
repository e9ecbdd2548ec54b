use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

use crate::ledger::model::Avatar;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub server: ServerSettings,
    pub arena: ArenaSettings,
    pub ledger: LedgerSettings,
    pub storage: StorageSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        println!("Loading configuration for RUN_MODE: {}", &run_mode);

        let s = Config::builder()
            // Load environment-specific file (e.g., development.toml, production.toml)
            .add_source(
                File::with_name(&format!("config/{}", run_mode))
                    .format(FileFormat::Toml)
                    .required(true),
            )
            // Add environment variables (e.g., APP_SERVER__PORT=8000)
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind_address: String,
    pub port: u16,
    pub log_level: String,
    pub metrics_auth_token: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub directory: String,
    pub filename: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ArenaSettings {
    pub heartbeat_interval_seconds: u64,
    pub client_timeout_seconds: u64,
    /// 대기열 항목 만료 시간. 응답 없는 클라이언트가 풀을 점유하지 못하게 함.
    pub queue_entry_ttl_seconds: u64,
    pub queue_sweep_interval_seconds: u64,
}

impl Default for ArenaSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval_seconds: 5,
            client_timeout_seconds: 15,
            queue_entry_ttl_seconds: 60,
            queue_sweep_interval_seconds: 5,
        }
    }
}

/// Ledger CAS 재시도 정책 및 선물 세율.
#[derive(Debug, Deserialize, Clone)]
pub struct LedgerSettings {
    pub retry_initial_interval_ms: u64,
    pub retry_max_interval_ms: u64,
    pub retry_max_elapsed_ms: u64,
    #[serde(default = "default_gift_tax_percent")]
    pub gift_tax_percent: u64,
}

fn default_gift_tax_percent() -> u64 {
    10
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            retry_initial_interval_ms: 5,
            retry_max_interval_ms: 100,
            retry_max_elapsed_ms: 2_000,
            gift_tax_percent: default_gift_tax_percent(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Memory,
    Redis,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub redis_url: String,
    pub audit_log_cap: usize,
    pub circuit_failure_threshold: u64,
    pub circuit_cooldown_seconds: u64,
    /// memory backend 전용 개발용 시드 데이터
    #[serde(default)]
    pub seed_users: Vec<SeedUser>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SeedUser {
    pub id: String,
    pub nickname: String,
    pub balance: u64,
    #[serde(default)]
    pub banned: bool,
    #[serde(default)]
    pub avatars: Vec<Avatar>,
}
