//! Tool catalog and dispatcher.
//!
//! The catalog maps each tool name to an [`Operation`]: display metadata, a
//! declared parameter list and a handler. Every call follows the same path:
//!
//! 1. Vault configured (for tools that touch the vault)
//! 2. Declared parameters present, in declaration order
//! 3. Store reachable
//! 4. Handler delegates to the [`VaultStore`]
//! 5. Success or store failure is rendered into the single-text envelope
//!
//! Steps 1-3 short-circuit, so a failing precondition never reaches the store.
//! Store errors are converted to [`Outcome::OperationFailed`] right where the
//! handler returns; nothing above this module sees a raw [`VaultError`].
//!
//! [`VaultError`]: crate::vault::VaultError

pub mod envelope;
pub mod notes;
pub mod validate;

pub use envelope::{Action, Outcome, ToolCallResult, ToolContent};
pub use validate::{check_required, check_vault_configured, ValidatedArgs, VAULT_NOT_SPECIFIED};

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::{CatalogError, DispatchError};
use crate::vault::{VaultError, VaultResult, VaultStore};

/// A declared tool parameter. All parameters are JSON strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    /// Argument key, e.g. `noteName`.
    pub name: &'static str,
    /// Human label used in "is required" messages, e.g. `Note name`.
    pub label: &'static str,
    /// Description published in the input schema.
    pub description: &'static str,
    /// Whether the argument must be present and non-empty.
    pub required: bool,
    /// Whether a whitespace-only value satisfies `required`.
    pub allow_blank: bool,
}

/// Tool handler: runs after every precondition has passed.
///
/// Returns the success text, or the store error to be rendered as a failure.
pub type Handler = fn(&Invocation<'_>) -> VaultResult<String>;

/// An immutable catalog entry.
#[derive(Clone, Copy)]
pub struct Operation {
    /// Unique tool name.
    pub name: &'static str,
    /// Display title.
    pub title: &'static str,
    /// Description shown to the client.
    pub description: &'static str,
    /// What the tool does, for failure messages.
    pub action: Action,
    /// Whether the tool needs a configured, reachable vault.
    pub requires_vault: bool,
    /// Declared parameters, in validation order.
    pub params: &'static [ParamSpec],
    /// The handler.
    pub handler: Handler,
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("action", &self.action)
            .field("requires_vault", &self.requires_vault)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl Operation {
    /// Builds the JSON schema describing this tool's arguments.
    #[must_use]
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| {
                (
                    p.name.to_string(),
                    json!({ "type": "string", "description": p.description }),
                )
            })
            .collect();
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Returns the `tools/list` entry for this operation.
    #[must_use]
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.to_string(),
            title: self.title.to_string(),
            description: self.description.to_string(),
            input_schema: self.input_schema(),
        }
    }

    fn run(&self, ctx: &CallContext<'_>, arguments: &Value) -> Result<Outcome, Outcome> {
        let vault = if self.requires_vault {
            check_vault_configured(ctx.vault)?
        } else {
            ""
        };
        let args = check_required(self.params, arguments, self.action)?;

        if self.requires_vault {
            ctx.store
                .ensure_available(vault)
                .map_err(|e| self.failed(&e))?;
        }

        let invocation = Invocation {
            vault,
            args,
            store: ctx.store,
            locks: ctx.locks,
        };
        let text = (self.handler)(&invocation).map_err(|e| self.failed(&e))?;
        Ok(Outcome::success(text))
    }

    fn failed(&self, error: &VaultError) -> Outcome {
        tracing::warn!(tool = self.name, error = %error, "Vault operation failed");
        Outcome::operation_failed(self.action, error)
    }
}

/// A tool definition for the `tools/list` response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Display title.
    pub title: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
}

/// Everything a handler may touch during one call.
pub struct Invocation<'a> {
    vault: &'a str,
    args: ValidatedArgs<'a>,
    store: &'a dyn VaultStore,
    locks: &'a NoteLocks,
}

impl<'a> Invocation<'a> {
    /// The configured vault; empty for tools that do not require one.
    #[must_use]
    pub const fn vault(&self) -> &'a str {
        self.vault
    }

    /// A validated argument value.
    #[must_use]
    pub fn arg(&self, name: &str) -> &'a str {
        self.args.get(name)
    }

    /// The vault store.
    #[must_use]
    pub fn store(&self) -> &'a dyn VaultStore {
        self.store
    }

    /// Runs `f` while holding the lock for note `name`.
    ///
    /// Read-modify-write sequences on one note must go through here so they
    /// cannot interleave.
    pub fn with_note_lock<T>(&self, name: &str, f: impl FnOnce() -> T) -> T {
        self.locks.with_lock(self.vault, name, f)
    }
}

/// Per-note locks for read-modify-write sequences such as append.
///
/// Holds an entry only while some call is using or waiting on that note.
#[derive(Debug, Default)]
pub struct NoteLocks {
    locks: Mutex<HashMap<(String, String), Arc<Mutex<()>>>>,
}

impl NoteLocks {
    /// Runs `f` while holding the lock for `name` in `vault`.
    pub fn with_lock<T>(&self, vault: &str, name: &str, f: impl FnOnce() -> T) -> T {
        let key = (vault.to_string(), name.to_string());
        let lock = Arc::clone(self.map().entry(key.clone()).or_default());

        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };

        // Handles are only cloned under the map lock, so the count is exact:
        // one in the map, one here.
        let mut locks = self.map();
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&key);
        }
        result
    }

    fn map(&self) -> MutexGuard<'_, HashMap<(String, String), Arc<Mutex<()>>>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct CallContext<'a> {
    vault: Option<&'a str>,
    store: &'a dyn VaultStore,
    locks: &'a NoteLocks,
}

/// The registry of tools served by this process.
///
/// Built once at startup and never mutated while serving.
pub struct Catalog {
    /// Registered operations, in registration (and listing) order.
    operations: Vec<Operation>,
    /// Target vault from configuration.
    vault: Option<String>,
    /// The secret store every handler delegates to.
    store: Box<dyn VaultStore>,
    /// Locks for append.
    note_locks: NoteLocks,
}

impl Catalog {
    /// Creates an empty catalog bound to a vault and store.
    #[must_use]
    pub fn new(vault: Option<String>, store: impl VaultStore + 'static) -> Self {
        Self {
            operations: Vec::new(),
            vault,
            store: Box::new(store),
            note_locks: NoteLocks::default(),
        }
    }

    /// Creates a catalog holding the seven secure note tools.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateOperation`] if the built-in tool
    /// list contains a name twice.
    pub fn with_secure_note_tools(
        vault: Option<String>,
        store: impl VaultStore + 'static,
    ) -> Result<Self, CatalogError> {
        let mut catalog = Self::new(vault, store);
        for operation in notes::operations() {
            catalog.register(operation)?;
        }
        Ok(catalog)
    }

    /// Registers an operation.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateOperation`] if the name is taken.
    pub fn register(&mut self, operation: Operation) -> Result<(), CatalogError> {
        if self.operation(operation.name).is_some() {
            return Err(CatalogError::DuplicateOperation {
                name: operation.name.to_string(),
            });
        }
        tracing::debug!(tool = operation.name, "Registered tool");
        self.operations.push(operation);
        Ok(())
    }

    /// Looks up an operation by name.
    #[must_use]
    pub fn operation(&self, name: &str) -> Option<&Operation> {
        self.operations.iter().find(|op| op.name == name)
    }

    /// The configured target vault.
    #[must_use]
    pub fn vault(&self) -> Option<&str> {
        self.vault.as_deref()
    }

    /// Returns the `tools/list` entries, in registration order.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.operations.iter().map(Operation::definition).collect()
    }

    /// Runs the named tool with caller-supplied arguments.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownOperation`] if no tool has that name.
    pub fn dispatch(&self, name: &str, arguments: &Value) -> Result<ToolCallResult, DispatchError> {
        let operation = self
            .operation(name)
            .ok_or_else(|| DispatchError::UnknownOperation {
                name: name.to_string(),
            })?;

        tracing::debug!(tool = name, "Dispatching tool call");

        let ctx = CallContext {
            vault: self.vault.as_deref(),
            store: self.store.as_ref(),
            locks: &self.note_locks,
        };
        let outcome = operation
            .run(&ctx, arguments)
            .unwrap_or_else(|outcome| outcome);
        Ok(outcome.render())
    }
}
