//! Tool outcomes and the uniform result envelope they render to.
//!
//! Every tool call, whatever happened, answers with exactly one text content
//! item. The envelope carries no structural error flag; success, missing
//! preconditions and store failures differ only in their text.

use std::fmt;

use serde::Serialize;

/// What a tool was trying to do, used in failure messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Query the `op` version.
    Version,
    /// List notes in the vault.
    List,
    /// Read a note.
    Get,
    /// Create a note.
    Create,
    /// Append to a note.
    Append,
    /// Replace a note's content.
    Update,
    /// Archive a note.
    Archive,
}

impl Action {
    /// The verb used in user-facing messages.
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Version => "query",
            Self::List => "list",
            Self::Get => "get",
            Self::Create => "create",
            Self::Append => "append",
            Self::Update => "update",
            Self::Archive => "archive",
        }
    }

    /// What the verb acts on in failure messages.
    const fn subject(self) -> &'static str {
        match self {
            Self::Version => "`op` version",
            Self::List => "secure notes",
            _ => "secure note",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// The result of running one tool handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The operation completed.
    Success {
        /// Text returned to the caller.
        text: String,
    },
    /// A precondition (vault configured, argument present) was not met.
    PreconditionFailed {
        /// Explanation returned to the caller.
        text: String,
    },
    /// The vault store reported a failure.
    OperationFailed {
        /// What was being attempted.
        action: Action,
        /// The store's error message.
        message: String,
    },
}

impl Outcome {
    /// Creates a success outcome.
    #[must_use]
    pub fn success(text: impl Into<String>) -> Self {
        Self::Success { text: text.into() }
    }

    /// Creates a precondition failure.
    #[must_use]
    pub fn precondition_failed(text: impl Into<String>) -> Self {
        Self::PreconditionFailed { text: text.into() }
    }

    /// Creates an operation failure from any displayable error.
    #[must_use]
    pub fn operation_failed(action: Action, error: &impl fmt::Display) -> Self {
        Self::OperationFailed {
            action,
            message: error.to_string(),
        }
    }

    /// Renders the outcome into the caller-facing envelope.
    #[must_use]
    pub fn render(self) -> ToolCallResult {
        let text = match self {
            Self::Success { text } | Self::PreconditionFailed { text } => text,
            Self::OperationFailed { action, message } => {
                format!(
                    "Failed to {} {}: {message}",
                    action.verb(),
                    action.subject()
                )
            }
        };
        ToolCallResult::text(text)
    }
}

/// Content item in a tool call response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Result of a tool call: always a single text item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
}

impl ToolCallResult {
    /// Creates a text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
        }
    }

    /// Returns the text of the single content item.
    #[must_use]
    pub fn as_text(&self) -> &str {
        match self.content.first() {
            Some(ToolContent::Text { text }) => text,
            None => "",
        }
    }
}

impl From<Outcome> for ToolCallResult {
    fn from(outcome: Outcome) -> Self {
        outcome.render()
    }
}
