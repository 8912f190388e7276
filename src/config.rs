//! Application configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Every setting has
//! a stock default, so the file is optional; when present it only needs the
//! keys it wants to override.
//!
//! ## Location
//!
//! `config.toml` is read from the directory passed with `--config`
//! (defaults to the working directory).
//!
//! ## Keys
//!
//! ```toml
//! # Every key is optional; these are the defaults
//!
//! default_images = ["zebra.jpg", "wallaby.png"]  # Shown when nothing is uploaded
//!
//! [limits]
//! max_file_size = 10485760  # Largest accepted upload, in bytes (10 MiB)
//! max_image_size = 2000     # Longer edge, in pixels, before removal
//!
//! [cache]
//! max_entries = 64          # Processed results kept in memory (0 = unbounded)
//! max_bytes = 536870912     # Memory budget for those results, in bytes (0 = unbounded)
//!
//! [removal]
//! tolerance = 48            # Border-key color distance treated as background (0-441)
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8501
//! ```
//!
//! Unknown keys are an error.

use crate::imaging::border_key::{DEFAULT_TOLERANCE, MAX_TOLERANCE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Largest upload accepted by default: 10 MiB.
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Default bounding dimension for processing, in pixels.
pub const DEFAULT_MAX_IMAGE_SIZE: u32 = 2000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Application configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Images tried in order when no file is uploaded. Relative paths are
    /// resolved against the config directory.
    pub default_images: Vec<PathBuf>,
    /// Upload and processing size guards.
    pub limits: LimitsConfig,
    /// Processing cache settings.
    pub cache: CacheConfig,
    /// Built-in removal engine settings.
    pub removal: RemovalConfig,
    /// Web server bind address.
    pub server: ServerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_images: vec![PathBuf::from("zebra.jpg"), PathBuf::from("wallaby.png")],
            limits: LimitsConfig::default(),
            cache: CacheConfig::default(),
            removal: RemovalConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_file_size == 0 {
            return Err(ConfigError::Validation(
                "limits.max_file_size must be non-zero".into(),
            ));
        }
        if self.limits.max_image_size == 0 {
            return Err(ConfigError::Validation(
                "limits.max_image_size must be non-zero".into(),
            ));
        }
        if self.removal.tolerance > MAX_TOLERANCE {
            return Err(ConfigError::Validation(format!(
                "removal.tolerance must be 0-{MAX_TOLERANCE}"
            )));
        }
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::Validation(
                "server.host must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Resolve `default_images` against `base`, keeping absolute paths as-is.
    pub fn resolve_default_images(&self, base: &Path) -> Vec<PathBuf> {
        self.default_images
            .iter()
            .map(|p| if p.is_absolute() { p.clone() } else { base.join(p) })
            .collect()
    }
}

/// Upload and processing size guards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Largest accepted input, in bytes. Larger files are rejected before decoding.
    pub max_file_size: usize,
    /// Bounding dimension (longer edge, pixels) images are fitted to before removal.
    pub max_image_size: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_image_size: DEFAULT_MAX_IMAGE_SIZE,
        }
    }
}

/// Processing cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Maximum processed results held in memory. `0` disables eviction.
    pub max_entries: usize,
    /// Memory budget for cached results, in bytes. `0` disables the budget.
    pub max_bytes: usize,
}

/// Default memory budget for the processing cache: 512 MiB.
pub const DEFAULT_CACHE_MAX_BYTES: usize = 512 * 1024 * 1024;

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 64,
            max_bytes: DEFAULT_CACHE_MAX_BYTES,
        }
    }
}

impl CacheConfig {
    /// Capacity in the form the cache expects: `None` means unbounded.
    pub fn capacity(&self) -> Option<usize> {
        (self.max_entries > 0).then_some(self.max_entries)
    }

    /// Byte budget in the form the cache expects: `None` means unlimited.
    pub fn byte_budget(&self) -> Option<usize> {
        (self.max_bytes > 0).then_some(self.max_bytes)
    }
}

/// Built-in removal engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemovalConfig {
    /// Color distance from the border color still treated as background.
    pub tolerance: u32,
}

impl Default for RemovalConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

/// Web server bind address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// Loading
// =============================================================================

/// [`AppConfig::default`] as a TOML table: the bottom layer every user file
/// is merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(AppConfig::default())?)
}

/// Deep-merge `overlay` onto `base`. Tables merge per key; any other value
/// in `overlay` wins outright, arrays included.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Parse `dir/config.toml` without interpreting it. `Ok(None)` when the
/// file does not exist.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Apply `overlay` (if any) to `base` and turn the result into a validated
/// [`AppConfig`].
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<AppConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Effective configuration for `dir`: stock defaults overridden by
/// `dir/config.toml` when it exists.
pub fn load_config(dir: &Path) -> Result<AppConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(dir)?;
    resolve_config(base, overlay)
}

/// Documented `config.toml` printed by `bgfix gen-config`. Parses to exactly
/// [`AppConfig::default`].
pub fn stock_config_toml() -> &'static str {
    r##"# bgfix Configuration
# ===================
# Every key is optional; the values below are the defaults.
# Misspelled or unknown keys are an error.

# Images shown when nothing has been uploaded, tried in order.
# Relative paths are resolved against the directory holding this file.
default_images = ["zebra.jpg", "wallaby.png"]

# ---------------------------------------------------------------------------
# Limits
# ---------------------------------------------------------------------------
[limits]
# Largest accepted upload, in bytes. Larger files are rejected up front.
max_file_size = 10485760

# Images whose longer edge exceeds this many pixels are scaled down
# (aspect ratio preserved) before the background is removed.
max_image_size = 2000

# ---------------------------------------------------------------------------
# Processing cache
# ---------------------------------------------------------------------------
[cache]
# Number of processed images kept in memory, keyed by file content.
# Re-uploading the same file is then instant. 0 = never evict.
max_entries = 64

# Memory budget for the cached images, in bytes. Decoded images are far
# larger than their files, so least recently used results are dropped once
# the total passes this. The newest result is always kept. 0 = no budget.
max_bytes = 536870912

# ---------------------------------------------------------------------------
# Background removal
# ---------------------------------------------------------------------------
[removal]
# How far (RGB distance, 0-441) a pixel may be from the border color and
# still count as background.
tolerance = 48

# ---------------------------------------------------------------------------
# Web server
# ---------------------------------------------------------------------------
[server]
host = "127.0.0.1"
port = 8501
"##
}
