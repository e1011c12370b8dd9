//! Persisted user settings.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Small key-value settings document, opaque to the catalogue core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub theme: String,
    pub language: String,
    pub auto_scan: bool,
    /// Scan interval in milliseconds.
    pub scan_interval: u64,
    /// Override for the directory downloaded tools land in.
    pub apps_directory: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: "light".to_string(),
            language: "zh-CN".to_string(),
            auto_scan: true,
            scan_interval: 5000,
            apps_directory: None,
        }
    }
}

impl Settings {
    /// Load settings; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
