//! Configuration loading and parsing.
//!
//! Settings are layered, later layers winning:
//!
//! 1. Built-in defaults
//! 2. JSON configuration file
//! 3. Environment (`OP_VAULT`, `OP_CLI_PATH`)
//! 4. CLI flags (applied by the binary)
//!
//! # Configuration File Locations
//!
//! 1. Path given as the `CONFIG_FILE` CLI argument (must exist)
//! 2. Default location, used only when present:
//!    - **Linux/macOS:** `~/.op-secure-notes-mcp/config.json`
//!    - **Windows:** `%USERPROFILE%\.op-secure-notes-mcp\config.json`

mod settings;

pub use settings::{Config, LoggingConfig, OpConfig};

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Returns the default configuration directory.
#[must_use]
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(".op-secure-notes-mcp"))
}

/// Returns the platform-specific default configuration file path.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|p| p.join("config.json"))
}

/// Loads the configuration file, falling back to defaults.
///
/// An explicit `path` must exist. Without one, the default location is read
/// if a file is there and defaults are used otherwise; the server runs fine
/// on environment variables alone.
///
/// # Errors
///
/// Returns an error if:
/// - An explicit configuration file cannot be found
/// - The file cannot be read
/// - The JSON is malformed
/// - Validation fails
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::NotFound {
                    path: p.to_path_buf(),
                });
            }
            p.to_path_buf()
        }
        None => match default_config_path().filter(|p| p.exists()) {
            Some(p) => p,
            None => return Ok(Config::default()),
        },
    };

    let contents = std::fs::read_to_string(&config_path).map_err(|e| ConfigError::ReadError {
        path: config_path.clone(),
        source: e,
    })?;

    let config: Config = serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: config_path.clone(),
        source: e,
    })?;

    config.validate()?;

    Ok(config)
}
