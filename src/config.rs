//! Configuration module for the launcher.
//!
//! This module provides functionality for managing the launcher configuration,
//! including:
//! - The DMM Game Player install folder used to locate the client executable
//! - Named game shortcuts and launcher relaunch shortcuts
//! - How the launcher relaunches itself through the elevation task
//! - Persisting configuration to disk as JSON
//! - Determining the appropriate data directory for the application
//!
//! The configuration is saved to and loaded from a `config.json` file located
//! in the platform-specific application data directory
//! (%APPDATA%/DMMGamePlayerFastLauncher/ on Windows).
//!
//! An [`AppConfig`] value is the configuration context handed to the launch
//! subsystem; nothing in the library reads it from a global.
//!
//! # Example
//!
//! ```no_run
//! use dgp_fast_launcher::config::{load_config, save_config};
//! use dgp_fast_launcher::shortcut::ShortcutRecord;
//!
//! let mut config = load_config();
//! config.add_shortcut("priconne", ShortcutRecord::new("priconner", r"C:\Games\priconne"));
//! save_config(&config).expect("Failed to save config");
//! ```

use crate::error::{LaunchError, Result};
use crate::shortcut::{LauncherShortcutRecord, ShortcutRecord};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.json";

/// Executable name of the DMM Game Player client
pub const CLIENT_EXECUTABLE: &str = "DMMGamePlayer.exe";

fn default_client_folder() -> PathBuf {
    PathBuf::from(r"C:\Program Files\DMMGamePlayer")
}

/// Application configuration
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AppConfig {
    /// DMM Game Player install folder
    #[serde(default = "default_client_folder")]
    pub dmm_game_player_folder: PathBuf,
    /// Game shortcuts by display name
    #[serde(default)]
    shortcuts: BTreeMap<String, ShortcutRecord>,
    /// Launcher relaunch shortcuts by display name
    #[serde(default)]
    launcher_shortcuts: BTreeMap<String, LauncherShortcutRecord>,
    /// Self-relaunch used by the elevation task. An empty path means the
    /// running executable.
    #[serde(default)]
    relaunch: LauncherShortcutRecord,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            dmm_game_player_folder: default_client_folder(),
            shortcuts: BTreeMap::new(),
            launcher_shortcuts: BTreeMap::new(),
            relaunch: LauncherShortcutRecord::default(),
        }
    }
}

impl AppConfig {
    /// Full path of the client executable inside the install folder
    pub fn client_executable(&self) -> PathBuf {
        self.dmm_game_player_folder.join(CLIENT_EXECUTABLE)
    }

    /// Add a shortcut, replacing any existing one with the same name
    pub fn add_shortcut(&mut self, name: impl Into<String>, record: ShortcutRecord) {
        self.shortcuts.insert(name.into(), record);
    }

    pub fn shortcut(&self, name: &str) -> Option<&ShortcutRecord> {
        self.shortcuts.get(name)
    }

    pub fn shortcut_mut(&mut self, name: &str) -> Option<&mut ShortcutRecord> {
        self.shortcuts.get_mut(name)
    }

    pub fn remove_shortcut(&mut self, name: &str) -> Option<ShortcutRecord> {
        self.shortcuts.remove(name)
    }

    /// Shortcut names in sorted order
    pub fn shortcut_names(&self) -> impl Iterator<Item = &str> {
        self.shortcuts.keys().map(String::as_str)
    }

    pub fn add_launcher_shortcut(&mut self, name: impl Into<String>, record: LauncherShortcutRecord) {
        self.launcher_shortcuts.insert(name.into(), record);
    }

    pub fn launcher_shortcut(&self, name: &str) -> Option<&LauncherShortcutRecord> {
        self.launcher_shortcuts.get(name)
    }

    pub fn launcher_shortcut_mut(&mut self, name: &str) -> Option<&mut LauncherShortcutRecord> {
        self.launcher_shortcuts.get_mut(name)
    }

    pub fn remove_launcher_shortcut(&mut self, name: &str) -> Option<LauncherShortcutRecord> {
        self.launcher_shortcuts.remove(name)
    }

    pub fn launcher_shortcut_names(&self) -> impl Iterator<Item = &str> {
        self.launcher_shortcuts.keys().map(String::as_str)
    }

    pub fn relaunch(&self) -> &LauncherShortcutRecord {
        &self.relaunch
    }

    pub fn relaunch_mut(&mut self) -> &mut LauncherShortcutRecord {
        &mut self.relaunch
    }
}

/// Get the application's data directory
/// Returns %APPDATA%/DMMGamePlayerFastLauncher/data on Windows
/// Creates directory if it doesn't exist
pub fn get_data_directory() -> Result<PathBuf> {
    let project_dirs = ProjectDirs::from("", "", "DMMGamePlayerFastLauncher")
        .ok_or_else(|| LaunchError::config("Failed to determine user data directory"))?;

    let data_dir = project_dirs.data_dir();

    fs::create_dir_all(data_dir).map_err(|source| LaunchError::Io {
        path: data_dir.to_path_buf(),
        source,
    })?;

    Ok(data_dir.to_path_buf())
}

/// Path of config.json inside the data directory
pub fn config_path() -> Result<PathBuf> {
    Ok(get_data_directory()?.join(CONFIG_FILE))
}

/// Load application configuration from config.json
/// Returns default config if file doesn't exist or on error
pub fn load_config() -> AppConfig {
    let Ok(path) = config_path() else {
        return AppConfig::default();
    };

    match load_config_from(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Using default config: {}", e);
            AppConfig::default()
        }
    }
}

/// Load configuration from an explicit path
/// A missing file yields the default config; unreadable or invalid JSON is an error
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(|source| LaunchError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&contents)
        .map_err(|e| LaunchError::config(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Save application configuration to config.json
pub fn save_config(config: &AppConfig) -> Result<()> {
    save_config_to(config, &config_path()?)
}

pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(config)
        .map_err(|e| LaunchError::config(format!("Failed to serialize config: {}", e)))?;

    fs::write(path, json).map_err(|source| LaunchError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!("Config saved to {:?}", path);
    Ok(())
}

/// Delete config.json so the next load starts from defaults
pub fn reset_config() -> Result<()> {
    reset_config_at(&config_path()?)
}

pub fn reset_config_at(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::info!("Config reset: {:?} removed", path);
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(LaunchError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Open the data directory in the platform file manager
pub fn open_data_folder() -> Result<()> {
    let data_dir = get_data_directory()?;
    tracing::info!("Opening data folder: {:?}", data_dir);

    open::that(&data_dir).map_err(|source| LaunchError::Io {
        path: data_dir,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shortcut::GameType;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.relaunch().account_path().as_os_str().is_empty());
        assert_eq!(config.shortcut_names().count(), 0);
        assert!(config.client_executable().ends_with(CLIENT_EXECUTABLE));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        let mut config = AppConfig::default();
        let mut record = ShortcutRecord::new("priconner", r"C:\Games\priconne");
        record.set_game_type(GameType::Acl);
        config.add_shortcut("priconne", record.clone());
        config.add_launcher_shortcut("self", LauncherShortcutRecord::new("launcher.exe"));

        save_config_to(&config, &path).unwrap();
        let loaded = load_config_from(&path).unwrap();

        assert_eq!(loaded, config);
        assert_eq!(loaded.shortcut("priconne"), Some(&record));
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let loaded = load_config_from(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(loaded, AppConfig::default());
    }

    #[test]
    fn test_legacy_task_name_is_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            r#"{"elevation_task_name": "\\Other\\Task", "relaunch": {"dgp_args": "--minimized"}}"#,
        )
        .unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.relaunch().dgp_args(), ["--minimized"]);

        let json = serde_json::to_string(&loaded).unwrap();
        assert!(!json.contains("elevation_task_name"));
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "{ not json").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, LaunchError::Config { .. }));
    }

    #[test]
    fn test_add_replaces_and_remove() {
        let mut config = AppConfig::default();
        config.add_shortcut("a", ShortcutRecord::new("1", "a.exe"));
        config.add_shortcut("a", ShortcutRecord::new("2", "a.exe"));
        assert_eq!(config.shortcut("a").unwrap().product_id(), "2");

        if let Some(record) = config.shortcut_mut("a") {
            record.set_rich_presence(false);
        }
        assert!(!config.shortcut("a").unwrap().rich_presence());

        assert!(config.remove_shortcut("a").is_some());
        assert!(config.remove_shortcut("a").is_none());
    }

    #[test]
    fn test_reset_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        save_config_to(&AppConfig::default(), &path).unwrap();

        reset_config_at(&path).unwrap();
        assert!(!path.exists());
        reset_config_at(&path).unwrap();
    }
}
