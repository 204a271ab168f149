//! Project configuration module.
//!
//! Loads the packaging-related keys of `.puprc`, the JSON file at the project
//! root. Stock defaults are overridden by whatever the file sets.
//!
//! ## Configuration Options
//!
//! ```json
//! {
//!   "paths": {
//!     "sync_files": [".distfiles", ".distinclude", ".distignore", ".gitattributes"],
//!     "zip_dir": ".pup-zip"
//!   },
//!   "zip_use_default_ignore": true,
//!   "zip_name": null
//! }
//! ```
//!
//! - `paths.sync_files`: every rule file to consult. Entries may point into
//!   subdirectories (`src/.distignore`); their rules apply relative to that
//!   directory.
//! - `paths.zip_dir`: staging directory, relative to the project root. It is
//!   always excluded from the package.
//! - `zip_use_default_ignore`: apply the bundled ignore list when no
//!   `.distfiles` allowlist exists.
//! - `zip_name`: archive base name; defaults to the project directory name.
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Objects merge key by key, anything else replaces
//! the default outright:
//!
//! ```json
//! { "paths": { "sync_files": [".distignore", "src/.distignore"] } }
//! ```
//!
//! `.puprc` also drives build, check and workflow commands that live outside
//! this crate, so keys not listed above are ignored rather than rejected.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path};
use thiserror::Error;

/// Config file name at the project root.
pub const CONFIG_FILENAME: &str = ".puprc";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Packaging configuration loaded from `.puprc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PupConfig {
    pub paths: PathsConfig,
    /// Apply the bundled default ignore list (no effect under `.distfiles`).
    pub zip_use_default_ignore: bool,
    /// Archive base name. `None` uses the project directory name.
    pub zip_name: Option<String>,
}

impl Default for PupConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            zip_use_default_ignore: true,
            zip_name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Rule files to read, relative to the project root.
    pub sync_files: Vec<String>,
    /// Staging directory, relative to the project root.
    pub zip_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            sync_files: vec![
                ".distfiles".to_string(),
                ".distinclude".to_string(),
                ".distignore".to_string(),
                ".gitattributes".to_string(),
            ],
            zip_dir: ".pup-zip".to_string(),
        }
    }
}

impl PupConfig {
    /// Validate values that would make packaging unsafe.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let zip_dir = Path::new(&self.paths.zip_dir);
        if zip_dir.is_absolute() {
            return Err(ConfigError::Validation(format!(
                "paths.zip_dir must be relative to the project root, got {}",
                self.paths.zip_dir
            )));
        }
        if zip_dir.components().any(|c| c == Component::ParentDir) {
            return Err(ConfigError::Validation(
                "paths.zip_dir must stay inside the project root".into(),
            ));
        }
        if self.zip_dir_relative().is_empty() {
            return Err(ConfigError::Validation(
                "paths.zip_dir must name a directory below the project root".into(),
            ));
        }
        if self.paths.sync_files.iter().any(|f| f.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "paths.sync_files entries must be non-empty".into(),
            ));
        }
        if let Some(name) = &self.zip_name
            && (name.trim().is_empty() || name.contains(['/', '\\']))
        {
            return Err(ConfigError::Validation(format!(
                "zip_name must be a plain file name, got {name:?}"
            )));
        }
        Ok(())
    }

    /// The staging directory as a `/`-separated root-relative path.
    ///
    /// `./.pup-zip/` and `.pup-zip` both yield `.pup-zip`.
    pub fn zip_dir_relative(&self) -> String {
        Path::new(&self.paths.zip_dir)
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Archive base name for the project at `root`.
    pub fn zip_name_for(&self, root: &Path) -> String {
        if let Some(name) = &self.zip_name {
            return name.clone();
        }
        fs::canonicalize(root)
            .ok()
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "package".to_string())
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a JSON object.
///
/// This is the base layer that user overrides are merged on top of.
pub fn stock_defaults_value() -> serde_json::Value {
    serde_json::to_value(PupConfig::default()).unwrap_or_default()
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Objects are merged key-by-key (overlay keys override base keys).
/// - Non-object values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_json(base: serde_json::Value, overlay: serde_json::Value) -> serde_json::Value {
    match (base, overlay) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_val) => merge_json(base_val, overlay_val),
                    None => overlay_val,
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Load `.puprc` from a directory as a raw JSON value.
///
/// Returns `Ok(None)` if no `.puprc` exists in the directory.
/// Returns `Err` if the file exists but is not valid JSON.
pub fn load_raw_config(root: &Path) -> Result<Option<serde_json::Value>, ConfigError> {
    let config_path = root.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: serde_json::Value = serde_json::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: serde_json::Value,
    overlay: Option<serde_json::Value>,
) -> Result<PupConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_json(base, ov),
        None => base,
    };
    let config: PupConfig = serde_json::from_value(merged)?;
    config.validate()?;
    Ok(config)
}

/// Load config from `.puprc` in the given directory.
pub fn load_config(root: &Path) -> Result<PupConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Stock `.puprc` contents, pretty-printed. Used by `pup gen-config`.
pub fn stock_config_json() -> String {
    serde_json::to_string_pretty(&stock_defaults_value()).unwrap_or_default()
}
