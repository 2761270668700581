//! User-tunable settings, stored as JSON.
//!
//! Every field has a default, so a partial (or absent) file is fine.

use crate::core::error::{MaintenanceError, Result};
use crate::core::paths::KodiPaths;
use crate::log_debug;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Add-on id this tool is published under; also the settings folder name.
pub const ADDON_ID: &str = "plugin.program.lazymaintenance";

/// Environment variable pointing at an alternative settings file.
pub const CONFIG_ENV: &str = "LAZYMAINT_CONFIG";

const SETTINGS_FILE_NAME: &str = "lazymaint.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Target size of the Thumbnails folder after an auto clean, in MB. `0` disables trimming.
    pub auto_clean_size_mb: u64,
    /// File name of the texture cache database inside `userdata/Database`.
    ///
    /// The number in the name changes between Kodi releases, hence configurable.
    pub texture_db: String,
    /// Base URL of the paste service used by `log upload`.
    pub paste_url: String,
    /// Add-on folders that survive a fresh start.
    pub keep_addons: Vec<String>,
    /// Force close Kodi after hard clean, restore and fresh start.
    pub force_close: bool,
    /// Program used to send builtin actions to a running Kodi.
    pub kodi_send: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            auto_clean_size_mb: 50,
            texture_db: "Textures13.db".to_string(),
            paste_url: "https://paste.kodi.tv".to_string(),
            keep_addons: vec![ADDON_ID.to_string()],
            force_close: true,
            kodi_send: "kodi-send".to_string(),
        }
    }
}

impl Settings {
    /// Default settings location: `<userdata>/addon_data/<ADDON_ID>/lazymaint.json`.
    pub fn default_path(paths: &KodiPaths) -> PathBuf {
        paths
            .userdata
            .join("addon_data")
            .join(ADDON_ID)
            .join(SETTINGS_FILE_NAME)
    }

    /// Picks the settings file: explicit path, then `LAZYMAINT_CONFIG`, then the default.
    pub fn resolve_path(explicit: Option<&Path>, paths: &KodiPaths) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| env::var_os(CONFIG_ENV).map(PathBuf::from))
            .unwrap_or_else(|| Self::default_path(paths))
    }

    /// Loads settings from `path`, falling back to defaults if the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log_debug!("No settings file at {}, using defaults", path.display());
            return Ok(Settings::default());
        }
        let raw = fs::read_to_string(path).map_err(|e| MaintenanceError::io(path, e))?;
        serde_json::from_str(&raw).map_err(|source| MaintenanceError::Settings {
            path: path.to_path_buf(),
            source,
        })
    }
}
