use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use tracing::trace;

use crate::actors::SchedulerSettings;
use crate::actors::retention::{DEFAULT_CLEANUP_INTERVAL, RetentionPolicy};
use crate::device::Device;
use crate::probes::ProbeTimeouts;

/// Storage backend configuration
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage (no persistence)
    #[serde(rename = "none")]
    None,

    /// SQLite database (default)
    Sqlite {
        /// Path to the SQLite database file
        #[serde(default = "default_sqlite_path")]
        path: PathBuf,

        /// Retention period in days (log entries older than this are deleted)
        #[serde(default)]
        retention_days: Option<u32>,

        /// Hours between retention cleanups
        #[serde(default)]
        cleanup_interval_hours: Option<u32>,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Sqlite {
            path: default_sqlite_path(),
            retention_days: None,
            cleanup_interval_hours: None,
        }
    }
}

impl StorageConfig {
    /// Log retention for this backend, if a retention period is configured
    pub fn retention_policy(&self) -> Option<RetentionPolicy> {
        match self {
            StorageConfig::None => None,
            StorageConfig::Sqlite {
                retention_days,
                cleanup_interval_hours,
                ..
            } => retention_days.map(|days| RetentionPolicy {
                retention_days: days,
                cleanup_interval: cleanup_interval_hours.map_or(DEFAULT_CLEANUP_INTERVAL, |hours| {
                    Duration::from_secs(u64::from(hours.max(1)) * 3600)
                }),
            }),
        }
    }
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./probewatch.db")
}

/// REST API settings
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct ApiSettings {
    /// Bind address; falls back to `--addr`/`--port` when absent
    #[serde(default)]
    pub bind: Option<SocketAddr>,

    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            bind: None,
            enable_cors: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Scheduler tick and probe timeouts, in milliseconds
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,
    #[serde(default = "default_tcp_timeout_ms")]
    pub tcp_timeout_ms: u64,
    #[serde(default = "default_udp_timeout_ms")]
    pub udp_timeout_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            http_timeout_ms: default_http_timeout_ms(),
            tcp_timeout_ms: default_tcp_timeout_ms(),
            udp_timeout_ms: default_udp_timeout_ms(),
        }
    }
}

impl SchedulerConfig {
    pub fn settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            tick: Duration::from_millis(self.tick_ms.max(1)),
        }
    }

    pub fn timeouts(&self) -> ProbeTimeouts {
        ProbeTimeouts {
            http: Duration::from_millis(self.http_timeout_ms),
            tcp: Duration::from_millis(self.tcp_timeout_ms),
            udp: Duration::from_millis(self.udp_timeout_ms),
        }
    }
}

fn default_tick_ms() -> u64 {
    1000
}

fn default_http_timeout_ms() -> u64 {
    10_000
}

fn default_tcp_timeout_ms() -> u64 {
    4000
}

fn default_udp_timeout_ms() -> u64 {
    3000
}

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
pub struct Config {
    /// Storage configuration (defaults to SQLite at ./probewatch.db)
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Devices upserted into the store at startup
    #[serde(default)]
    pub devices: Vec<Device>,
}

pub fn read_config_file(path: impl AsRef<Path>) -> anyhow::Result<Config> {
    let path = path.as_ref();
    let file_content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration file {}", path.display()))?;
    serde_json::from_str(&file_content)
        .with_context(|| format!("invalid configuration file {}", path.display()))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
