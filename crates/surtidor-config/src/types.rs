//! Configuration structures.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use surtidor_core::defaults;

use crate::defaults::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    #[serde(default)]
    pub session: SessionConfig,
    /// Remote directory synchronization. Omit the section to run fully
    /// offline from the local snapshot.
    #[serde(default)]
    pub sync: Option<SyncConfig>,
    #[serde(default)]
    pub clock: ClockConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the snapshot, ledger and key-value store. Created
    /// at boot; failure to do so is fatal.
    pub data_dir: PathBuf,
    /// Maximum user records held in memory; the snapshot loader truncates
    /// past this.
    #[serde(default = "default_max_users")]
    pub max_users: usize,
}

impl StorageConfig {
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(defaults::SNAPSHOT_FILE)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(defaults::LEDGER_FILE)
    }

    pub fn kv_path(&self) -> PathBuf {
        self.data_dir.join(defaults::KV_FILE)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_input_timeout_secs")]
    pub input_timeout_secs: u64,
    #[serde(default = "default_dispense_max_secs")]
    pub dispense_max_secs: u64,
    #[serde(default = "default_validating_max_secs")]
    pub validating_max_secs: u64,
    #[serde(default = "default_notice_ms")]
    pub notice_ms: u64,
    #[serde(default = "default_format_notice_ms")]
    pub format_notice_ms: u64,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            input_timeout_secs: default_input_timeout_secs(),
            dispense_max_secs: default_dispense_max_secs(),
            validating_max_secs: default_validating_max_secs(),
            notice_ms: default_notice_ms(),
            format_notice_ms: default_format_notice_ms(),
            tick_ms: default_tick_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// URL answering the current snapshot version as an ASCII decimal.
    pub version_url: String,
    /// URL answering the full JSON snapshot.
    pub snapshot_url: String,
    #[serde(default = "default_sync_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_sync_startup_delay_secs")]
    pub startup_delay_secs: u64,
    #[serde(default = "default_snapshot_timeout_secs")]
    pub snapshot_timeout_secs: u64,
    #[serde(default = "default_version_timeout_secs")]
    pub version_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockConfig {
    /// Fixed UTC offset the kiosk computes "today" in, minutes.
    #[serde(default = "default_utc_offset_mins")]
    pub utc_offset_mins: i32,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            utc_offset_mins: default_utc_offset_mins(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base log level (trace/debug/info/warn/error). Defaults to info.
    pub level: Option<String>,
}
