use serde::{Deserialize, Serialize};

/// Speaker of one reconstructed turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Assistant,
    User,
    System,
}

/// A correlated tool invocation: call, raw argument text, and eventual result.
///
/// `id` is empty when the originating encoding omitted identifiers; correlation
/// then happened by arrival order. `name` is empty for synthesized calls that
/// exist only to carry an otherwise-orphaned result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub id: String,
    /// Raw argument text, accumulated from fragments. Usually valid JSON, but
    /// never validated here; display-side prettifying is the caller's concern.
    pub arguments: String,
    pub result: String,
}

impl ToolCall {
    /// Synthesizes a nameless call carrying only a result, used when a result
    /// arrives with no matching invocation so the payload is not lost.
    #[must_use]
    pub fn orphan_result(result: impl Into<String>) -> Self {
        Self {
            result: result.into(),
            ..Self::default()
        }
    }
}

/// In-progress correlation record for a tool call whose argument fragments
/// and result have not all arrived yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingToolCall {
    pub name: String,
    pub id: String,
    pub arguments: String,
    pub result: Option<String>,
}

impl PendingToolCall {
    #[must_use]
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            arguments: String::new(),
            result: None,
        }
    }

    /// Freezes this record into an immutable [`ToolCall`]. A pending call
    /// flushed before its result arrived keeps an empty result.
    #[must_use]
    pub fn finish(self) -> ToolCall {
        ToolCall {
            name: self.name,
            id: self.id,
            arguments: self.arguments,
            result: self.result.unwrap_or_default(),
        }
    }
}

/// One reconstructed unit of conversation output.
///
/// Turns are immutable once yielded; ownership passes entirely to the caller.
/// A turn is never emitted empty: it carries non-blank text, at least one tool
/// call, or both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    /// Cost/usage summary such as `"$0.0123 | in:450 | out:89"`, present only
    /// on turns closed by a result event that carried usage data.
    pub usage: Option<String>,
}

impl Turn {
    #[must_use]
    pub fn assistant(text: String, tool_calls: Vec<ToolCall>, usage: Option<String>) -> Self {
        Self {
            role: Role::Assistant,
            text,
            tool_calls,
            usage,
        }
    }

    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            tool_calls: Vec::new(),
            usage: None,
        }
    }

    #[must_use]
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            text: text.into(),
            tool_calls: Vec::new(),
            usage: None,
        }
    }
}
