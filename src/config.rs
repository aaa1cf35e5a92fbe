//! Command-line and environment configuration for the `wallet-ledger` server.

use crate::application::dispatcher::{DispatchConfig, OverflowPolicy};
use crate::application::ledger::LedgerConfig;
use crate::logging::LogFormat;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Wallet balance ledger served over HTTP.
///
/// Every flag can also be set through the environment variable shown in
/// `--help`; flags win over the environment.
#[derive(Parser, Debug)]
#[command(name = "wallet-ledger", author, version, about, long_about = None)]
pub struct ServerArgs {
    /// Port the HTTP API listens on.
    #[arg(long, env = "HTTP_PORT", default_value_t = 8080)]
    pub http_port: u16,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Capacity of each per-wallet queue.
    #[arg(
        long,
        env = "WALLET_QUEUE_CAPACITY",
        default_value_t = 1000,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub queue_capacity: u32,

    /// Behavior when a wallet's queue is full.
    #[arg(
        long,
        env = "WALLET_OVERFLOW_POLICY",
        value_enum,
        default_value_t = OverflowPolicy::Block
    )]
    pub overflow_policy: OverflowPolicy,

    /// Number of independently locked queue registry shards.
    #[arg(
        long,
        env = "WALLET_REGISTRY_SHARDS",
        default_value_t = 16,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub registry_shards: u32,

    /// Seconds a wallet worker may sit idle before its queue is retired.
    #[arg(long, env = "WALLET_IDLE_TIMEOUT_SECS", default_value_t = 300)]
    pub idle_timeout_secs: u64,

    /// Upper bound on a single storage call, in milliseconds.
    #[arg(long, env = "WALLET_OPERATION_TIMEOUT_MS", default_value_t = 5000)]
    pub operation_timeout_ms: u64,

    /// Seconds to wait for in-flight operations on shutdown.
    #[arg(long, env = "SHUTDOWN_TIMEOUT_SECS", default_value_t = 30)]
    pub shutdown_timeout_secs: u64,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Default log filter; `RUST_LOG` takes precedence.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl ServerArgs {
    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            dispatch: DispatchConfig {
                queue_capacity: self.queue_capacity as usize,
                overflow_policy: self.overflow_policy,
                shards: self.registry_shards as usize,
                idle_timeout: Duration::from_secs(self.idle_timeout_secs),
            },
            operation_timeout: Duration::from_millis(self.operation_timeout_ms),
            ..LedgerConfig::default()
        }
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}
