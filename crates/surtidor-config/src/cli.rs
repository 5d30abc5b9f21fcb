//! CLI override definitions and application logic.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;
use crate::defaults::*;
use crate::types::SyncConfig;

#[derive(Debug, Clone, Parser, Default)]
pub struct CliOverrides {
    /// Override the data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    /// Override the maximum in-memory user count
    #[arg(long)]
    pub max_users: Option<usize>,
    /// Override the input timeout (seconds)
    #[arg(long)]
    pub input_timeout_secs: Option<u64>,
    /// Override the maximum dispense window (seconds)
    #[arg(long)]
    pub dispense_max_secs: Option<u64>,
    /// Override the sync cycle period (seconds)
    #[arg(long)]
    pub sync_interval_secs: Option<u64>,
    /// Override the remote version URL (enables sync)
    #[arg(long)]
    pub version_url: Option<String>,
    /// Override the remote snapshot URL (enables sync)
    #[arg(long)]
    pub snapshot_url: Option<String>,
    /// Disable remote synchronization entirely
    #[arg(long)]
    pub no_sync: bool,
    /// Override the UTC offset used for "today" (minutes)
    #[arg(long)]
    pub utc_offset_mins: Option<i32>,
    /// Override log level (trace/debug/info/warn/error)
    #[arg(long)]
    pub log_level: Option<String>,
}

pub fn apply_overrides(config: &mut Config, overrides: &CliOverrides) {
    if let Some(v) = &overrides.data_dir {
        config.storage.data_dir = v.clone();
    }
    if let Some(v) = overrides.max_users {
        config.storage.max_users = v;
    }
    if let Some(v) = overrides.input_timeout_secs {
        config.session.input_timeout_secs = v;
    }
    if let Some(v) = overrides.dispense_max_secs {
        config.session.dispense_max_secs = v;
    }
    if overrides.no_sync {
        config.sync = None;
    } else if overrides.version_url.is_some() || overrides.snapshot_url.is_some() {
        let sync = config.sync.get_or_insert_with(|| SyncConfig {
            version_url: String::new(),
            snapshot_url: String::new(),
            interval_secs: default_sync_interval_secs(),
            startup_delay_secs: default_sync_startup_delay_secs(),
            snapshot_timeout_secs: default_snapshot_timeout_secs(),
            version_timeout_secs: default_version_timeout_secs(),
        });
        if let Some(v) = &overrides.version_url {
            sync.version_url = v.clone();
        }
        if let Some(v) = &overrides.snapshot_url {
            sync.snapshot_url = v.clone();
        }
    }
    if let Some(v) = overrides.sync_interval_secs
        && let Some(sync) = &mut config.sync
    {
        sync.interval_secs = v;
    }
    if let Some(v) = overrides.utc_offset_mins {
        config.clock.utc_offset_mins = v;
    }
    if let Some(v) = &overrides.log_level {
        config.logging.level = Some(v.clone());
    }
}
