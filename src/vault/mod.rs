//! Narrow interface to the external secret store.
//!
//! Everything the tools need from 1Password goes through [`VaultStore`]. The
//! production implementation is [`OpCli`], which shells out to the `op`
//! command-line tool; tests substitute in-memory stores.
//!
//! Authentication and session state belong to `op` itself and are not
//! modelled here. Any call may fail for reasons outside this process (not
//! signed in, network unavailable, item absent), and every such failure is
//! reported as a [`VaultError`].

mod op_cli;

pub use op_cli::OpCli;

use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

/// Result type for vault operations.
pub type VaultResult<T> = Result<T, VaultError>;

/// Errors raised by the vault adapter.
///
/// Display strings are written to be shown to the caller verbatim, after the
/// `Failed to ... secure note:` prefix.
#[derive(Debug, Error)]
pub enum VaultError {
    /// The named item is absent from the vault (or archived).
    #[error("\"{name}\" may not exist - consider creating it first")]
    ItemNotFound {
        /// Note name that was looked up.
        name: String,
    },

    /// The store refused to create the item.
    #[error("could not create \"{name}\": {message}")]
    DuplicateOrInvalid {
        /// Note name that was being created.
        name: String,
        /// Diagnostic reported by the store.
        message: String,
    },

    /// `op` ran but exited unsuccessfully.
    #[error("`op` exited with {status}: {message}")]
    CommandFailed {
        /// Exit status description.
        status: String,
        /// Diagnostic printed on stderr.
        message: String,
    },

    /// `op` could not be started at all.
    #[error("could not run `{}`: {source}", binary.display())]
    Spawn {
        /// The binary that was invoked.
        binary: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// `op` produced output that could not be understood.
    #[error("unexpected output from `op`: {message}")]
    InvalidOutput {
        /// Description of what's wrong.
        message: String,
    },

    /// The item template could not be written for `op` to read.
    #[error("could not write item template: {source}")]
    Template {
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The vault could not be reached: `op` is missing, signed out, or the
    /// account has no access to the vault.
    #[error("cannot access vault \"{vault}\": {reason}")]
    Unavailable {
        /// Vault that was checked.
        vault: String,
        /// Why the check failed.
        reason: String,
    },
}

/// One entry from a vault listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ItemSummary {
    /// Opaque item identifier.
    pub id: String,
    /// Item title, the name notes are addressed by.
    pub title: String,
    /// Item category as reported by the store (e.g. `SECURE_NOTE`).
    #[serde(default)]
    pub category: String,
}

/// Operations the tool layer performs against the secret store.
///
/// Calls block until the store answers. Implementations must not retain
/// state between calls beyond what the store itself persists.
pub trait VaultStore: Send + Sync {
    /// Returns the version string of the store's CLI.
    ///
    /// # Errors
    ///
    /// Returns an error if the CLI cannot be run.
    fn version(&self) -> VaultResult<String>;

    /// Confirms `vault` exists and is accessible with the current session.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Unavailable`] if the vault cannot be reached.
    fn ensure_available(&self, vault: &str) -> VaultResult<()>;

    /// Lists the secure notes in `vault`.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails.
    fn list_items(&self, vault: &str) -> VaultResult<Vec<ItemSummary>>;

    /// Fetches the plain-text note field of item `name`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::ItemNotFound`] if there is no such item.
    fn get_note_field(&self, vault: &str, name: &str) -> VaultResult<String>;

    /// Creates a secure note titled `name` holding `content`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::DuplicateOrInvalid`] if the store rejects it.
    fn create_item(&self, vault: &str, name: &str, content: &str) -> VaultResult<()>;

    /// Replaces the note field of item `name` with `content`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::ItemNotFound`] if there is no such item.
    fn replace_note_field(&self, vault: &str, name: &str, content: &str) -> VaultResult<()>;

    /// Archives item `name`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::ItemNotFound`] if there is no such item.
    fn archive_item(&self, vault: &str, name: &str) -> VaultResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_hints_at_creation() {
        let err = VaultError::ItemNotFound {
            name: "draft".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "\"draft\" may not exist - consider creating it first"
        );
    }

    #[test]
    fn spawn_error_names_binary() {
        let err = VaultError::Spawn {
            binary: PathBuf::from("/missing/op"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/missing/op"));
        assert!(msg.contains("No such file"));
    }

    #[test]
    fn unavailable_names_the_vault() {
        let err = VaultError::Unavailable {
            vault: "Personal".to_string(),
            reason: "You are not currently signed in.".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "cannot access vault \"Personal\": You are not currently signed in."
        );
    }

    #[test]
    fn item_summary_ignores_extra_fields() {
        let json = r#"{
            "id": "abc123",
            "title": "draft",
            "version": 2,
            "vault": { "id": "v1", "name": "Personal" },
            "category": "SECURE_NOTE"
        }"#;
        let item: ItemSummary = serde_json::from_str(json).unwrap();
        assert_eq!(item.title, "draft");
        assert_eq!(item.category, "SECURE_NOTE");
    }
}
