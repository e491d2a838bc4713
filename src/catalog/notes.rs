//! The secure note tools.
//!
//! Handlers here run only after the catalog has validated their
//! preconditions, so they read arguments without re-checking them.

use super::{Action, Invocation, Operation, ParamSpec};
use crate::vault::VaultResult;

/// The `noteName` parameter.
pub const NOTE_NAME: ParamSpec = ParamSpec {
    name: "noteName",
    label: "Note name",
    description: "Title of the secure note in the configured vault",
    required: true,
    allow_blank: false,
};

/// The `content` parameter.
pub const CONTENT: ParamSpec = ParamSpec {
    name: "content",
    label: "Content",
    description: "Plain-text content for the note",
    required: true,
    allow_blank: true,
};

/// Returns the built-in operations, in listing order.
#[must_use]
pub fn operations() -> Vec<Operation> {
    vec![
        Operation {
            name: "op-version",
            title: "1Password CLI Version",
            description: "Report the version of the 1Password CLI (`op`)",
            action: Action::Version,
            requires_vault: false,
            params: &[],
            handler: op_version,
        },
        Operation {
            name: "list-secure-notes",
            title: "List Secure Notes",
            description: "List the secure notes in the configured 1Password vault",
            action: Action::List,
            requires_vault: true,
            params: &[],
            handler: list_secure_notes,
        },
        Operation {
            name: "get-secure-note",
            title: "Get Secure Note",
            description: "Get the content of a secure note from the configured 1Password vault",
            action: Action::Get,
            requires_vault: true,
            params: &[NOTE_NAME],
            handler: get_secure_note,
        },
        Operation {
            name: "create-secure-note",
            title: "Create Secure Note",
            description: "Create a new secure note in the configured 1Password vault",
            action: Action::Create,
            requires_vault: true,
            params: &[NOTE_NAME, CONTENT],
            handler: create_secure_note,
        },
        Operation {
            name: "append-secure-note",
            title: "Append to Secure Note",
            description: "Append content to an existing secure note, separated by a newline",
            action: Action::Append,
            requires_vault: true,
            params: &[NOTE_NAME, CONTENT],
            handler: append_secure_note,
        },
        Operation {
            name: "update-secure-note",
            title: "Update Secure Note",
            description: "Replace the entire content of an existing secure note",
            action: Action::Update,
            requires_vault: true,
            params: &[NOTE_NAME, CONTENT],
            handler: update_secure_note,
        },
        Operation {
            name: "archive-secure-note",
            title: "Archive Secure Note",
            description: "Move a secure note to the archive of the configured 1Password vault",
            action: Action::Archive,
            requires_vault: true,
            params: &[NOTE_NAME],
            handler: archive_secure_note,
        },
    ]
}

fn op_version(call: &Invocation<'_>) -> VaultResult<String> {
    let version = call.store().version()?;
    Ok(format!("`op` version: {version}"))
}

fn list_secure_notes(call: &Invocation<'_>) -> VaultResult<String> {
    let vault = call.vault();
    let items = call.store().list_items(vault)?;
    tracing::debug!(vault, count = items.len(), "Listed secure notes");

    let mut text = match items.len() {
        0 => return Ok(format!("There are no secure notes in the \"{vault}\" vault.")),
        1 => format!("There is 1 secure note in the \"{vault}\" vault:"),
        n => format!("There are {n} secure notes in the \"{vault}\" vault:"),
    };
    for item in &items {
        text.push_str("\n- ");
        text.push_str(&item.title);
    }
    Ok(text)
}

fn get_secure_note(call: &Invocation<'_>) -> VaultResult<String> {
    call.store()
        .get_note_field(call.vault(), call.arg(NOTE_NAME.name))
}

fn create_secure_note(call: &Invocation<'_>) -> VaultResult<String> {
    let name = call.arg(NOTE_NAME.name);
    call.store()
        .create_item(call.vault(), name, call.arg(CONTENT.name))?;
    tracing::info!(note = name, "Created secure note");
    Ok(format!("Created secure note \"{name}\"."))
}

fn append_secure_note(call: &Invocation<'_>) -> VaultResult<String> {
    let name = call.arg(NOTE_NAME.name);
    let store = call.store();

    call.with_note_lock(name, || {
        let existing = store.get_note_field(call.vault(), name)?;
        let combined = append_line(&existing, call.arg(CONTENT.name));
        store.replace_note_field(call.vault(), name, &combined)
    })?;

    tracing::info!(note = name, "Appended to secure note");
    Ok(format!("Appended content to secure note \"{name}\"."))
}

fn update_secure_note(call: &Invocation<'_>) -> VaultResult<String> {
    let name = call.arg(NOTE_NAME.name);
    call.store()
        .replace_note_field(call.vault(), name, call.arg(CONTENT.name))?;
    tracing::info!(note = name, "Replaced secure note content");
    Ok(format!("Replaced the content of secure note \"{name}\"."))
}

fn archive_secure_note(call: &Invocation<'_>) -> VaultResult<String> {
    let name = call.arg(NOTE_NAME.name);
    call.store().archive_item(call.vault(), name)?;
    tracing::info!(note = name, "Archived secure note");
    Ok(format!("Archived secure note \"{name}\"."))
}

/// Joins existing note content and an addition with a single newline.
///
/// An empty note takes the addition as-is rather than gaining a leading
/// newline.
fn append_line(existing: &str, addition: &str) -> String {
    if existing.is_empty() {
        addition.to_string()
    } else {
        format!("{existing}\n{addition}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_uses_single_newline() {
        assert_eq!(append_line("a", "b"), "a\nb");
    }

    #[test]
    fn append_to_empty_note_has_no_leading_newline() {
        assert_eq!(append_line("", "b"), "b");
    }

    #[test]
    fn append_keeps_existing_whitespace() {
        assert_eq!(append_line("a\n", "b"), "a\n\nb");
    }

    #[test]
    fn operation_names_are_unique() {
        let ops = operations();
        for (i, op) in ops.iter().enumerate() {
            assert!(
                ops[i + 1..].iter().all(|other| other.name != op.name),
                "duplicate {}",
                op.name
            );
        }
    }

    #[test]
    fn only_op_version_skips_the_vault() {
        for op in operations() {
            assert_eq!(op.requires_vault, op.name != "op-version", "{}", op.name);
        }
    }
}
