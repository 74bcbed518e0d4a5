//! Persistent drivehist configuration.
//!
//! Holds the user-configured mapping list. Stored as JSON under the platform
//! config directory; a missing file is an empty configuration, a corrupt one
//! is logged and ignored.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// drivehist configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// User-configured local-root → remote mappings, highest priority of the
    /// four discovery sources.
    #[serde(default)]
    pub mappings: Vec<MappingEntry>,
}

/// One configured mapping, as written by the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingEntry {
    /// Local sync root. Entries blank after trimming are discarded at
    /// discovery time.
    pub local_root: String,
    /// Explicit drive id; the resolver trusts it exclusively when set.
    #[serde(default)]
    pub drive_id: Option<String>,
    /// Remote folder the local root maps to (default "/").
    #[serde(default)]
    pub remote_root: Option<String>,
    /// Sync-relationship namespace URL.
    #[serde(default)]
    pub url_namespace: Option<String>,
    /// Full remote URL of the mount root.
    #[serde(default)]
    pub full_remote_path: Option<String>,
}

impl HistoryConfig {
    /// Default config location: `<config dir>/drivehist/config.json`
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("drivehist")
            .join("config.json")
    }

    /// Load from the default location.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load from an explicit path. Missing file → default; unparseable file
    /// → default with a warning.
    pub fn load_from(path: &Path) -> Self {
        let Ok(raw) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&raw) {
            Ok(config) => config,
            Err(e) => {
                warn!("ignoring unparseable config at {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Save to the default location.
    pub fn save(&self) -> std::io::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = HistoryConfig::load_from(&dir.path().join("nope.json"));
        assert!(config.mappings.is_empty());
    }

    #[test]
    fn test_load_corrupt_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        let config = HistoryConfig::load_from(&path);
        assert!(config.mappings.is_empty());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("config.json");

        let config = HistoryConfig {
            mappings: vec![MappingEntry {
                local_root: "/users/x/OneDrive".to_string(),
                drive_id: Some("b!abc".to_string()),
                remote_root: Some("/Documents".to_string()),
                url_namespace: None,
                full_remote_path: None,
            }],
        };
        config.save_to(&path).unwrap();

        let loaded = HistoryConfig::load_from(&path);
        assert_eq!(loaded.mappings.len(), 1);
        assert_eq!(loaded.mappings[0].local_root, "/users/x/OneDrive");
        assert_eq!(loaded.mappings[0].drive_id.as_deref(), Some("b!abc"));
        assert_eq!(loaded.mappings[0].remote_root.as_deref(), Some("/Documents"));
    }

    #[test]
    fn test_entry_accepts_camel_case_keys() {
        let raw = r#"{"mappings":[{"localRoot":"/a","driveId":"d1"}]}"#;
        let config: HistoryConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.mappings[0].local_root, "/a");
        assert_eq!(config.mappings[0].drive_id.as_deref(), Some("d1"));
    }
}
