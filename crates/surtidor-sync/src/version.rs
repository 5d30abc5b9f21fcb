//! Persisted snapshot version.
//!
//! A single `u32` under a named key in a small JSON key-value file. A
//! missing or unreadable file reads as version 0 (first run), so a fresh
//! install always pulls the remote snapshot.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::warn;

use surtidor_core::defaults::VERSION_KEY;

use crate::error::SyncError;

/// File-backed store for the loaded directory version.
#[derive(Debug, Clone)]
pub struct VersionStore {
    path: PathBuf,
}

impl VersionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted version; 0 when nothing was ever stored.
    pub fn load(&self) -> u32 {
        let Ok(data) = std::fs::read_to_string(&self.path) else {
            return 0;
        };
        let map: Map<String, Value> = match serde_json::from_str(&data) {
            Ok(map) => map,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "version store unreadable, treating as first run");
                return 0;
            }
        };
        map.get(VERSION_KEY)
            .and_then(Value::as_u64)
            .map(|v| v as u32)
            .unwrap_or(0)
    }

    /// Persist a new version, preserving any other keys in the file.
    /// Written via temp + rename so a torn store is never visible.
    pub fn store(&self, version: u32) -> Result<(), SyncError> {
        let mut map: Map<String, Value> = std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|data| serde_json::from_str(&data).ok())
            .unwrap_or_default();
        map.insert(VERSION_KEY.to_string(), Value::from(version));

        let tmp_path = self.path.with_extension("tmp");
        std::fs::write(&tmp_path, serde_json::to_vec_pretty(&map)?)?;
        // On Windows, rename fails if the destination exists; remove it first.
        #[cfg(target_os = "windows")]
        {
            let _ = std::fs::remove_file(&self.path);
        }
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reads_as_zero() {
        let dir = tempfile::tempdir().unwrap();
        let store = VersionStore::new(dir.path().join("kv.json"));
        assert_eq!(store.load(), 0);
    }

    #[test]
    fn store_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = VersionStore::new(dir.path().join("kv.json"));
        store.store(17).unwrap();
        assert_eq!(store.load(), 17);
        store.store(18).unwrap();
        assert_eq!(store.load(), 18);
    }

    #[test]
    fn other_keys_survive_a_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.json");
        std::fs::write(&path, r#"{"ap_ssid": "kiosk", "directory_version": 3}"#).unwrap();
        let store = VersionStore::new(&path);
        assert_eq!(store.load(), 3);
        store.store(4).unwrap();
        let data = std::fs::read_to_string(&path).unwrap();
        let map: Map<String, Value> = serde_json::from_str(&data).unwrap();
        assert_eq!(map.get("ap_ssid").and_then(Value::as_str), Some("kiosk"));
        assert_eq!(store.load(), 4);
    }

    #[test]
    fn garbage_file_reads_as_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.json");
        std::fs::write(&path, "not json").unwrap();
        assert_eq!(VersionStore::new(&path).load(), 0);
    }
}
