//! [`VaultStore`] backed by the 1Password `op` CLI.
//!
//! Each call spawns `op` synchronously and waits for it to exit. Commands
//! that print data use `--format json`; failures are classified from the
//! diagnostic `op` writes to stderr.
//!
//! Note content never appears on the command line, where other local users
//! could read it. Writes pass the item as a JSON template in a private
//! temporary file that is removed as soon as `op` exits.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde_json::{json, Value};
use tempfile::NamedTempFile;

use super::{ItemSummary, VaultError, VaultResult, VaultStore};
use crate::config::OpConfig;

/// Item category used for every note this server lists.
const SECURE_NOTE_CATEGORY: &str = "Secure Note";

/// Category identifier used in item templates.
const SECURE_NOTE_TEMPLATE_CATEGORY: &str = "SECURE_NOTE";

/// Label of the built-in note field of a secure note.
const NOTE_FIELD: &str = "notesPlain";

/// Runs `op` subcommands on behalf of the tools.
#[derive(Debug, Clone)]
pub struct OpCli {
    /// Path or name of the `op` executable.
    binary: PathBuf,
    /// Optional `--account` selector.
    account: Option<String>,
}

impl OpCli {
    /// Creates a CLI wrapper for `binary`.
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>, account: Option<String>) -> Self {
        Self {
            binary: binary.into(),
            account,
        }
    }

    /// Creates a CLI wrapper from the `op` section of the configuration.
    #[must_use]
    pub fn from_config(config: &OpConfig) -> Self {
        Self::new(config.binary.clone(), config.account.clone())
    }

    /// Returns the configured binary.
    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Runs `op` with `args` and returns its stdout.
    fn run(&self, args: &[String]) -> VaultResult<String> {
        let mut command = Command::new(&self.binary);
        // Global flag; must precede the `--` separator in `args`.
        if let Some(account) = &self.account {
            command.arg("--account").arg(account);
        }
        command.args(args);

        tracing::debug!(binary = %self.binary.display(), subcommand = ?args.first(), "Running op");

        let output = command
            .stdin(Stdio::null())
            .output()
            .map_err(|source| VaultError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        if output.status.success() {
            return String::from_utf8(output.stdout).map_err(|e| VaultError::InvalidOutput {
                message: format!("stdout is not UTF-8: {e}"),
            });
        }

        let message = clean_stderr(&String::from_utf8_lossy(&output.stderr));
        tracing::debug!(status = %output.status, %message, "op failed");
        Err(VaultError::CommandFailed {
            status: output.status.to_string(),
            message,
        })
    }
}

impl VaultStore for OpCli {
    fn version(&self) -> VaultResult<String> {
        let stdout = self.run(&version_args())?;
        let version = stdout.trim();
        if version.is_empty() {
            return Err(VaultError::InvalidOutput {
                message: "empty version string".to_string(),
            });
        }
        Ok(version.to_string())
    }

    fn ensure_available(&self, vault: &str) -> VaultResult<()> {
        self.run(&vault_check_args(vault))
            .map(|_| ())
            .map_err(|e| VaultError::Unavailable {
                vault: vault.to_string(),
                reason: match e {
                    VaultError::CommandFailed { message, .. } => message,
                    other => other.to_string(),
                },
            })
    }

    fn list_items(&self, vault: &str) -> VaultResult<Vec<ItemSummary>> {
        let stdout = self.run(&list_args(vault))?;
        parse_item_list(&stdout)
    }

    fn get_note_field(&self, vault: &str, name: &str) -> VaultResult<String> {
        let stdout = self
            .run(&get_args(vault, name))
            .map_err(|e| classify_missing(e, name))?;
        parse_note_field(&stdout)
    }

    fn create_item(&self, vault: &str, name: &str, content: &str) -> VaultResult<()> {
        let template = write_template(&note_template(name, content))?;
        self.run(&create_args(vault, template.path()))
            .map(|_| ())
            .map_err(|e| match e {
                VaultError::CommandFailed { message, .. } => VaultError::DuplicateOrInvalid {
                    name: name.to_string(),
                    message,
                },
                other => other,
            })
    }

    fn replace_note_field(&self, vault: &str, name: &str, content: &str) -> VaultResult<()> {
        let template = write_template(&note_template(name, content))?;
        self.run(&edit_args(vault, name, template.path()))
            .map(|_| ())
            .map_err(|e| classify_missing(e, name))
    }

    fn archive_item(&self, vault: &str, name: &str) -> VaultResult<()> {
        self.run(&archive_args(vault, name))
            .map(|_| ())
            .map_err(|e| classify_missing(e, name))
    }
}

// Positional values follow `--` so a note or vault name starting with a dash
// is not read as a flag.

fn version_args() -> Vec<String> {
    vec!["--version".to_string()]
}

fn vault_check_args(vault: &str) -> Vec<String> {
    ["vault", "get", "--format", "json", "--", vault]
        .map(String::from)
        .into()
}

fn list_args(vault: &str) -> Vec<String> {
    [
        "item",
        "list",
        "--vault",
        vault,
        "--categories",
        SECURE_NOTE_CATEGORY,
        "--format",
        "json",
    ]
    .map(String::from)
    .into()
}

fn get_args(vault: &str, name: &str) -> Vec<String> {
    let fields = format!("label={NOTE_FIELD}");
    [
        "item",
        "get",
        "--vault",
        vault,
        "--fields",
        fields.as_str(),
        "--format",
        "json",
        "--reveal",
        "--",
        name,
    ]
    .map(String::from)
    .into()
}

fn create_args(vault: &str, template: &Path) -> Vec<String> {
    let template = template.to_string_lossy();
    [
        "item",
        "create",
        "--vault",
        vault,
        "--template",
        &*template,
        "--format",
        "json",
    ]
    .map(String::from)
    .into()
}

fn edit_args(vault: &str, name: &str, template: &Path) -> Vec<String> {
    let template = template.to_string_lossy();
    [
        "item",
        "edit",
        "--vault",
        vault,
        "--template",
        &*template,
        "--format",
        "json",
        "--",
        name,
    ]
    .map(String::from)
    .into()
}

fn archive_args(vault: &str, name: &str) -> Vec<String> {
    ["item", "delete", "--vault", vault, "--archive", "--", name]
        .map(String::from)
        .into()
}

/// Item template for a secure note titled `name` holding `content`.
fn note_template(name: &str, content: &str) -> Value {
    json!({
        "title": name,
        "category": SECURE_NOTE_TEMPLATE_CATEGORY,
        "fields": [{
            "id": NOTE_FIELD,
            "type": "STRING",
            "purpose": "NOTES",
            "label": NOTE_FIELD,
            "value": content,
        }],
    })
}

/// Writes `template` to a temporary file readable only by this user.
///
/// The file is deleted when the returned handle is dropped.
fn write_template(template: &Value) -> VaultResult<NamedTempFile> {
    let mut file = NamedTempFile::new().map_err(|source| VaultError::Template { source })?;
    serde_json::to_writer(&mut file, template).map_err(|e| VaultError::Template {
        source: e.into(),
    })?;
    file.flush()
        .map_err(|source| VaultError::Template { source })?;
    Ok(file)
}

fn parse_item_list(stdout: &str) -> VaultResult<Vec<ItemSummary>> {
    // `op` prints nothing at all for an empty vault.
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(stdout).map_err(|e| VaultError::InvalidOutput {
        message: format!("item list is not valid JSON: {e}"),
    })
}

/// Extracts the field value from `op item get --fields ... --format json`.
///
/// A single field comes back as an object, several as an array; a field with
/// no value omits `value` entirely.
fn parse_note_field(stdout: &str) -> VaultResult<String> {
    let json: Value = serde_json::from_str(stdout).map_err(|e| VaultError::InvalidOutput {
        message: format!("note field is not valid JSON: {e}"),
    })?;

    let field = match &json {
        Value::Array(fields) => preferred_field(fields),
        Value::Object(_) => Some(&json),
        _ => None,
    }
    .ok_or_else(|| VaultError::InvalidOutput {
        message: format!("no {NOTE_FIELD} field in response"),
    })?;

    Ok(field_value(field).unwrap_or_default().to_string())
}

/// Picks among several fields sharing the note label: a concealed field
/// with a value, then any field with a value, then the first.
fn preferred_field(fields: &[Value]) -> Option<&Value> {
    let has_value = |f: &&Value| field_value(f).is_some_and(|v| !v.is_empty());

    fields
        .iter()
        .find(|f| f.get("type").and_then(Value::as_str) == Some("CONCEALED") && has_value(f))
        .or_else(|| fields.iter().find(has_value))
        .or_else(|| fields.first())
}

fn field_value(field: &Value) -> Option<&str> {
    field.get("value").and_then(Value::as_str)
}

/// Turns an `op` failure that reports a missing item into `ItemNotFound`.
fn classify_missing(error: VaultError, name: &str) -> VaultError {
    match error {
        VaultError::CommandFailed { ref message, .. } if reports_missing_item(message) => {
            VaultError::ItemNotFound {
                name: name.to_string(),
            }
        }
        other => other,
    }
}

fn reports_missing_item(message: &str) -> bool {
    let message = message.to_lowercase();
    ["isn't an item", "no item found", "item not found"]
        .iter()
        .any(|needle| message.contains(needle))
}

/// Strips the `[ERROR] YYYY/MM/DD HH:MM:SS` prefix `op` puts on diagnostics.
fn clean_stderr(raw: &str) -> String {
    let line = raw.trim();
    let line = line.strip_prefix("[ERROR]").map_or(line, str::trim_start);

    let mut parts = line.splitn(3, ' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(date), Some(time), Some(rest))
            if is_timestamp_part(date, '/') && is_timestamp_part(time, ':') =>
        {
            rest.trim().to_string()
        }
        _ => line.to_string(),
    }
}

fn is_timestamp_part(part: &str, separator: char) -> bool {
    part.contains(separator) && part.chars().all(|c| c.is_ascii_digit() || c == separator)
}
