//! Filesystem locations for the catalogue documents and user data.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

/// The read-mostly catalogue document shipped with the application.
pub const BUILTIN_CONFIG_FILE: &str = "builtin-apps.json";
/// The user-editable catalogue document.
pub const EXTERNAL_CONFIG_FILE: &str = "external-apps.json";
/// Persisted user settings.
pub const SETTINGS_FILE: &str = "settings.json";

/// Resolved locations for configuration and user data.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Directory holding the two catalogue documents and the settings file.
    pub config_dir: PathBuf,
    /// User data root that `./`-prefixed entry paths resolve against.
    pub data_dir: PathBuf,
}

impl Paths {
    /// Platform-standard locations for the installed application.
    pub fn discover() -> Option<Self> {
        let dirs = ProjectDirs::from("", "", "mediarack")?;
        Some(Self {
            config_dir: dirs.config_dir().to_path_buf(),
            data_dir: dirs.data_dir().to_path_buf(),
        })
    }

    /// Root everything under one directory (tests, `--root` override).
    pub fn at(root: &Path) -> Self {
        Self {
            config_dir: root.join("configs"),
            data_dir: root.to_path_buf(),
        }
    }

    pub fn builtin_config(&self) -> PathBuf {
        self.config_dir.join(BUILTIN_CONFIG_FILE)
    }

    pub fn external_config(&self) -> PathBuf {
        self.config_dir.join(EXTERNAL_CONFIG_FILE)
    }

    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join(SETTINGS_FILE)
    }

    /// Create both directories if they are missing.
    pub fn ensure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}
