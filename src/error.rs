//! Error types for op-secure-notes-mcp.
//!
//! # Security Note
//!
//! Error messages never include note content. Vault errors carry the note
//! name and whatever diagnostic `op` printed on stderr, nothing more.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors raised while assembling the tool catalog.
///
/// These are fatal: a catalog in this state must not start serving.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CatalogError {
    /// Two operations were registered under the same name.
    #[error("operation already registered: {name}")]
    DuplicateOperation {
        /// The conflicting operation name.
        name: String,
    },
}

/// Errors raised while dispatching a tool call.
///
/// Reported through the JSON-RPC error path, never through the text envelope.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DispatchError {
    /// The requested operation is not in the catalog.
    #[error("Unknown tool: {name}")]
    UnknownOperation {
        /// The name the caller asked for.
        name: String,
    },
}
