//! Configuration file loading and error types.

use std::{fs, path::Path};

use crate::Config;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("toml: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("unsupported config format")]
    UnsupportedFormat,
    #[error("validation: {0}")]
    Validation(String),
}

pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let data = fs::read_to_string(path)?;
    match path.extension().and_then(|s| s.to_str()).unwrap_or("") {
        "json" | "jsonc" => {
            let stripped = json_comments::StripComments::new(data.as_bytes());
            Ok(serde_json::from_reader(stripped)?)
        }
        "yaml" | "yml" => Ok(serde_yaml::from_str(&data)?),
        "toml" => Ok(toml::from_str(&data)?),
        _ => Err(ConfigError::UnsupportedFormat),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn loads_toml() {
        let (_dir, path) = write_temp(
            "config.toml",
            r#"
[storage]
data_dir = "/var/lib/surtidor"

[sync]
version_url = "https://example.com/exec?cmd=version"
snapshot_url = "https://example.com/exec"
"#,
        );
        let config = load_config(&path).unwrap();
        assert_eq!(config.storage.max_users, 3000);
        assert_eq!(config.session.input_timeout_secs, 30);
        assert_eq!(config.sync.unwrap().interval_secs, 100);
    }

    #[test]
    fn loads_jsonc_with_comments() {
        let (_dir, path) = write_temp(
            "config.jsonc",
            r#"{
  // kiosk storage
  "storage": { "data_dir": "/tmp/surtidor", "max_users": 10 }
}"#,
        );
        let config = load_config(&path).unwrap();
        assert_eq!(config.storage.max_users, 10);
        assert!(config.sync.is_none());
    }

    #[test]
    fn rejects_unknown_extension() {
        let (_dir, path) = write_temp("config.ini", "x = 1");
        assert!(matches!(
            load_config(&path),
            Err(ConfigError::UnsupportedFormat)
        ));
    }
}
