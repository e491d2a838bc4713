//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::ConfigError;

/// Log levels accepted in `logging.level`.
const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Root configuration structure.
///
/// After [`Config::apply_env`] and any CLI overrides are applied, the value is
/// treated as immutable for the rest of the process.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Name of the 1Password vault that holds the secure notes.
    #[serde(default)]
    pub vault: Option<String>,

    /// `op` CLI settings.
    #[serde(default)]
    pub op: OpConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.op.binary.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "op.binary cannot be empty".to_string(),
            });
        }

        let level = self.logging.level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }
        Ok(())
    }

    /// Overlays settings taken from the environment.
    ///
    /// `lookup` resolves a variable name to its value, which keeps this
    /// testable without touching the process environment.
    ///
    /// - `OP_VAULT` sets the target vault
    /// - `OP_CLI_PATH` sets the `op` binary
    ///
    /// A blank variable counts as unset and leaves the file's value alone.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(vault) = non_blank("OP_VAULT") {
            self.set_vault(Some(vault));
        }
        if let Some(binary) = non_blank("OP_CLI_PATH") {
            self.op.binary = PathBuf::from(binary);
        }
    }

    /// Sets the target vault, treating blank names as "not configured".
    pub fn set_vault(&mut self, vault: Option<String>) {
        self.vault = vault
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
    }
}

/// Settings for invoking the 1Password CLI.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpConfig {
    /// Path or name of the `op` executable.
    #[serde(default = "default_op_binary")]
    pub binary: PathBuf,

    /// Account shorthand, sign-in address or ID, passed as `--account`.
    #[serde(default)]
    pub account: Option<String>,
}

impl Default for OpConfig {
    fn default() -> Self {
        Self {
            binary: default_op_binary(),
            account: None,
        }
    }
}

fn default_op_binary() -> PathBuf {
    PathBuf::from("op")
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn parse_minimal_config() {
        let json = r"{}";
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert!(config.vault.is_none());
        assert_eq!(config.op.binary, PathBuf::from("op"));
    }

    #[test]
    fn parse_full_config() {
        let json = r#"{
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "_comment": "Test config",
            "vault": "Personal",
            "op": {
                "binary": "/usr/local/bin/op",
                "account": "my.1password.com"
            },
            "logging": {
                "level": "debug"
            }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.vault.as_deref(), Some("Personal"));
        assert_eq!(config.op.binary, PathBuf::from("/usr/local/bin/op"));
        assert_eq!(config.op.account.as_deref(), Some("my.1password.com"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn logging_config_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "warn");
    }

    #[test]
    fn reject_unknown_log_level() {
        let json = r#"{ "logging": { "level": "verbose" } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_empty_binary() {
        let json = r#"{ "op": { "binary": "" } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_unknown_fields() {
        let json = r#"{
            "unknown_field": "value"
        }"#;

        let result: Result<Config, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn env_overrides_file_vault() {
        let mut config: Config = serde_json::from_str(r#"{ "vault": "Work" }"#).unwrap();
        config.apply_env(env_of(&[("OP_VAULT", "Personal"), ("OP_CLI_PATH", "/opt/op")]));
        assert_eq!(config.vault.as_deref(), Some("Personal"));
        assert_eq!(config.op.binary, PathBuf::from("/opt/op"));
    }

    #[test]
    fn empty_env_vault_counts_as_unset() {
        let mut config = Config::default();
        config.apply_env(env_of(&[("OP_VAULT", "   ")]));
        assert!(config.vault.is_none());
    }

    #[test]
    fn blank_env_vault_keeps_file_vault() {
        let mut config: Config = serde_json::from_str(r#"{ "vault": "Work" }"#).unwrap();
        config.apply_env(env_of(&[("OP_VAULT", ""), ("OP_CLI_PATH", " ")]));
        assert_eq!(config.vault.as_deref(), Some("Work"));
        assert_eq!(config.op.binary, PathBuf::from("op"));
    }

    #[test]
    fn missing_env_keeps_file_values() {
        let mut config: Config = serde_json::from_str(r#"{ "vault": "Work" }"#).unwrap();
        config.apply_env(env_of(&[]));
        assert_eq!(config.vault.as_deref(), Some("Work"));
        assert_eq!(config.op.binary, PathBuf::from("op"));
    }
}
