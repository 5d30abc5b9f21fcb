//! Configuration loading and CLI definitions for the kiosk.

mod cli;
mod defaults;
mod loader;
mod types;
mod validate;

pub use cli::{CliOverrides, apply_overrides};
pub use loader::{ConfigError, load_config};
pub use types::{
    ClockConfig, Config, LoggingConfig, SessionConfig, StorageConfig, SyncConfig,
};
pub use validate::validate_config;
