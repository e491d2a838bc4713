//! Precondition checks run before any call into the vault.
//!
//! Order is fixed: vault configured, then each declared parameter in schema
//! order. The first failure short-circuits, so the store is never called with
//! an unconfigured vault or a missing key.

use serde_json::Value;

use super::envelope::{Action, Outcome};
use super::ParamSpec;

/// Shown when no target vault is configured.
pub const VAULT_NOT_SPECIFIED: &str =
    "Vault hasn't been specified. To use this tool, set the OP_VAULT environment variable.";

/// Arguments that passed validation, keyed by parameter name.
#[derive(Debug, Default)]
pub struct ValidatedArgs<'a> {
    values: Vec<(&'static str, &'a str)>,
}

impl<'a> ValidatedArgs<'a> {
    /// Returns the value of `name`, or `""` if it was optional and absent.
    #[must_use]
    pub fn get(&self, name: &str) -> &'a str {
        self.values
            .iter()
            .find(|(key, _)| *key == name)
            .map_or("", |&(_, value)| value)
    }
}

/// Checks that a target vault is configured.
///
/// # Errors
///
/// Returns a `PreconditionFailed` outcome when `vault` is absent or blank.
pub fn check_vault_configured(vault: Option<&str>) -> Result<&str, Outcome> {
    match vault {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Outcome::precondition_failed(VAULT_NOT_SPECIFIED)),
    }
}

/// Checks caller arguments against the declared parameters.
///
/// Parameters are JSON strings. A required one that is absent, `null` or
/// empty fails with `"{label} is required to {action} the secure note."`,
/// as does a whitespace-only value unless the parameter allows blanks;
/// a present value of another JSON type fails regardless of whether it is
/// required. Undeclared arguments are ignored.
///
/// # Errors
///
/// Returns a `PreconditionFailed` outcome naming the first offending
/// parameter in declaration order.
pub fn check_required<'a>(
    params: &[ParamSpec],
    arguments: &'a Value,
    action: Action,
) -> Result<ValidatedArgs<'a>, Outcome> {
    let mut validated = ValidatedArgs::default();

    for param in params {
        match arguments.get(param.name) {
            None | Some(Value::Null) => {
                if param.required {
                    return Err(missing(param, action));
                }
            }
            Some(Value::String(value)) => {
                let blank = if param.allow_blank {
                    value.is_empty()
                } else {
                    value.trim().is_empty()
                };
                if param.required && blank {
                    return Err(missing(param, action));
                }
                validated.values.push((param.name, value.as_str()));
            }
            Some(_) => {
                return Err(Outcome::precondition_failed(format!(
                    "Argument '{}' must be a string to {action} the secure note.",
                    param.name
                )));
            }
        }
    }

    Ok(validated)
}

fn missing(param: &ParamSpec, action: Action) -> Outcome {
    Outcome::precondition_failed(format!(
        "{} is required to {action} the secure note.",
        param.label
    ))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::catalog::notes::{CONTENT, NOTE_NAME};

    fn text(outcome: Outcome) -> String {
        outcome.render().as_text().to_string()
    }

    #[test]
    fn vault_missing_or_blank_fails() {
        for vault in [None, Some(""), Some("  ")] {
            let err = check_vault_configured(vault).unwrap_err();
            assert_eq!(text(err), VAULT_NOT_SPECIFIED);
        }
        assert_eq!(check_vault_configured(Some("Personal")).unwrap(), "Personal");
    }

    #[test]
    fn first_missing_field_in_declaration_order() {
        let params = [NOTE_NAME, CONTENT];
        let err = check_required(&params, &json!({}), Action::Create).unwrap_err();
        assert_eq!(text(err), "Note name is required to create the secure note.");

        let err =
            check_required(&params, &json!({"noteName": "draft"}), Action::Append).unwrap_err();
        assert_eq!(text(err), "Content is required to append the secure note.");
    }

    #[test]
    fn blank_and_null_count_as_missing() {
        let params = [NOTE_NAME];
        for args in [json!({"noteName": ""}), json!({"noteName": "  "}), json!({"noteName": null})]
        {
            let err = check_required(&params, &args, Action::Get).unwrap_err();
            assert_eq!(text(err), "Note name is required to get the secure note.");
        }
    }

    #[test]
    fn whitespace_content_is_accepted() {
        for content in [" ", "\n", "\t"] {
            let args = json!({"noteName": "draft", "content": content});
            let validated = check_required(&[NOTE_NAME, CONTENT], &args, Action::Append).unwrap();
            assert_eq!(validated.get("content"), content);
        }

        let err = check_required(&[CONTENT], &json!({"content": ""}), Action::Update).unwrap_err();
        assert_eq!(text(err), "Content is required to update the secure note.");
    }

    #[test]
    fn non_string_value_is_rejected() {
        let err = check_required(&[NOTE_NAME], &json!({"noteName": 42}), Action::Archive)
            .unwrap_err();
        assert_eq!(
            text(err),
            "Argument 'noteName' must be a string to archive the secure note."
        );
    }

    #[test]
    fn non_object_arguments_have_no_fields() {
        let err = check_required(&[NOTE_NAME], &Value::Null, Action::Get).unwrap_err();
        assert!(matches!(err, Outcome::PreconditionFailed { .. }));
    }

    #[test]
    fn validated_values_are_returned() {
        let args = json!({"noteName": "draft", "content": "hello", "extra": true});
        let validated = check_required(&[NOTE_NAME, CONTENT], &args, Action::Update).unwrap();
        assert_eq!(validated.get("noteName"), "draft");
        assert_eq!(validated.get("content"), "hello");
        assert_eq!(validated.get("extra"), "");
    }

    #[test]
    fn optional_params_may_be_absent() {
        let optional = ParamSpec {
            required: false,
            ..NOTE_NAME
        };
        let args = json!({});
        let validated = check_required(&[optional], &args, Action::Get).unwrap();
        assert_eq!(validated.get("noteName"), "");
    }
}
