//! Configuration file support for imgsync.
//!
//! Settings are stored as JSON. Every field has a default, so a partial file
//! (or none at all) is valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_DOUBLE_TAP_WINDOW_MS, DEFAULT_GROUP_LABEL, DEFAULT_INDICATOR_FADE_MS,
    DEFAULT_WHEEL_STEP,
};

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// What happens to unsaved images when the grouping key changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum KeyChangePolicy {
    /// Drop pending images; they belonged to the previous key
    #[default]
    Discard,
    /// Carry pending images over to the new key
    Keep,
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Synchronization behavior
    #[serde(default)]
    pub sync: SyncConfig,

    /// Full-size viewer behavior
    #[serde(default)]
    pub viewer: ViewerConfig,

    /// Location of the JSON record store used by the command-line tool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,
}

/// Synchronization section of the config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Label of the owning table written with every new record
    #[serde(default = "default_group_label")]
    pub group_label: String,

    /// Handling of pending images on key change
    #[serde(default)]
    pub key_change_policy: KeyChangePolicy,

    /// Issue all creates of a save-all at once instead of one after another
    #[serde(default)]
    pub concurrent_save_all: bool,
}

fn default_group_label() -> String {
    DEFAULT_GROUP_LABEL.to_string()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            group_label: default_group_label(),
            key_change_policy: KeyChangePolicy::default(),
            concurrent_save_all: false,
        }
    }
}

/// Viewer section of the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Maximum gap between two touch ends for a double-tap, in milliseconds
    #[serde(default = "default_double_tap_window_ms")]
    pub double_tap_window_ms: u64,

    /// Zoom indicator lifetime, in milliseconds
    #[serde(default = "default_indicator_fade_ms")]
    pub indicator_fade_ms: u64,

    /// Scale change per wheel notch
    #[serde(default = "default_wheel_step")]
    pub wheel_step: f32,
}

fn default_double_tap_window_ms() -> u64 {
    DEFAULT_DOUBLE_TAP_WINDOW_MS
}

fn default_indicator_fade_ms() -> u64 {
    DEFAULT_INDICATOR_FADE_MS
}

fn default_wheel_step() -> f32 {
    DEFAULT_WHEEL_STEP
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            double_tap_window_ms: default_double_tap_window_ms(),
            indicator_fade_ms: default_indicator_fade_ms(),
            wheel_step: default_wheel_step(),
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            log_level: LogLevel::default(),
            sync: SyncConfig::default(),
            viewer: ViewerConfig::default(),
            store_path: None,
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        // Validate version compatibility
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    /// Get the default filename for the config file.
    pub fn default_filename() -> &'static str {
        "imgsync-config.json"
    }

    /// Get the default config file path.
    /// Returns None on WASM (no filesystem access).
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Option<PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("imgsync").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("imgsync")
                    .join(Self::default_filename())
            })
        }
    }

    /// Default location of the JSON record store in the user data directory.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_store_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("imgsync").join("images.json"))
    }

    /// Load configuration from an explicit path.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Try to load configuration from the default path.
    /// Returns None if the file doesn't exist or can't be read.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return None;
        }

        match Self::load_from_path(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                None
            }
        }
    }

    /// Save configuration to the given path, creating parent directories.
    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = self.to_json()?;
        std::fs::write(path, json)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
