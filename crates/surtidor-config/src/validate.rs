//! Configuration validation logic.

use crate::Config;
use crate::loader::ConfigError;

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.storage.data_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation("storage.data_dir is empty".into()));
    }
    if config.storage.max_users == 0 {
        return Err(ConfigError::Validation(
            "storage.max_users must be > 0".into(),
        ));
    }
    if config.session.input_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "session.input_timeout_secs must be > 0".into(),
        ));
    }
    if config.session.dispense_max_secs == 0 {
        return Err(ConfigError::Validation(
            "session.dispense_max_secs must be > 0".into(),
        ));
    }
    if config.session.tick_ms == 0 {
        return Err(ConfigError::Validation("session.tick_ms must be > 0".into()));
    }
    if let Some(sync) = &config.sync {
        if sync.version_url.trim().is_empty() {
            return Err(ConfigError::Validation("sync.version_url is empty".into()));
        }
        if sync.snapshot_url.trim().is_empty() {
            return Err(ConfigError::Validation("sync.snapshot_url is empty".into()));
        }
        if sync.interval_secs == 0 {
            return Err(ConfigError::Validation(
                "sync.interval_secs must be > 0".into(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::*;

    fn base_config() -> Config {
        Config {
            storage: StorageConfig {
                data_dir: "/tmp/surtidor".into(),
                max_users: 100,
            },
            session: SessionConfig::default(),
            sync: None,
            clock: ClockConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn accepts_minimal_config() {
        assert!(validate_config(&base_config()).is_ok());
    }

    #[test]
    fn rejects_zero_capacity() {
        let mut config = base_config();
        config.storage.max_users = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_sync_without_urls() {
        let mut config = base_config();
        config.sync = Some(SyncConfig {
            version_url: String::new(),
            snapshot_url: "https://example.com/exec".into(),
            interval_secs: 100,
            startup_delay_secs: 10,
            snapshot_timeout_secs: 15,
            version_timeout_secs: 5,
        });
        assert!(validate_config(&config).is_err());
    }
}
