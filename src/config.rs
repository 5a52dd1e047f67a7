//! Editor configuration, read from JSON files.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::editor::PersistPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Per-surface editor behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// When reorders reach the remote store
    pub persistence: PersistPolicy,
    /// Cap on concurrent remote calls during a save; 0 = unbounded
    pub max_concurrent_ops: usize,
    /// Refetch (or restore the baseline order) when persisting an order fails
    pub revert_on_reorder_failure: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            persistence: PersistPolicy::Deferred,
            max_concurrent_ops: 8,
            revert_on_reorder_failure: true,
        }
    }
}

impl EditorConfig {
    /// Task block canvas: reorders wait for the explicit save
    pub fn block_canvas() -> Self {
        Self::default()
    }

    /// Dashboard and member widget grids: reorders persist at once
    pub fn widget_grid() -> Self {
        Self {
            persistence: PersistPolicy::Immediate,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read `path`; a missing file yields the default configuration
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("no editor config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EditorConfig::from_json(r#"{ "persistence": "immediate" }"#).unwrap();
        assert_eq!(config.persistence, PersistPolicy::Immediate);
        assert_eq!(config.max_concurrent_ops, 8);
        assert!(config.revert_on_reorder_failure);
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        let result = EditorConfig::from_json(r#"{ "persistence": "sometimes" }"#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_presets() {
        assert_eq!(EditorConfig::block_canvas().persistence, PersistPolicy::Deferred);
        assert_eq!(EditorConfig::widget_grid().persistence, PersistPolicy::Immediate);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = r#"{ "max_concurrent_ops": 0, "revert_on_reorder_failure": false }"#;
        write!(file, "{}", json).unwrap();

        let config = EditorConfig::load(file.path()).unwrap();
        assert_eq!(config.max_concurrent_ops, 0);
        assert!(!config.revert_on_reorder_failure);
        assert_eq!(config.persistence, PersistPolicy::Deferred);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = EditorConfig::load(&dir.path().join("editor.json")).unwrap();
        assert_eq!(config, EditorConfig::default());
    }
}
