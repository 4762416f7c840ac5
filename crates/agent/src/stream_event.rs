//! Turn progress events.
//!
//! `TurnEvent`s are emitted while a turn runs so a front end can show tool
//! activity as it happens, before the final reply is ready.

use serde::Serialize;
use toolpilot_core::tool::ToolResult;

use crate::parser::ParseFailure;

/// Events emitted by the agent loop during a turn.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// Past exchanges were recalled for this turn.
    ContextRecalled { count: usize },

    /// The model is about to be called.
    Thinking { iteration: usize },

    /// The model requested a tool.
    ToolCall {
        id: String,
        name: String,
        arguments: serde_json::Value,
    },

    /// A tool finished, successfully or not.
    ToolResult { result: ToolResult },

    /// A `<tool_call>` block was skipped.
    ParseFailure { failure: ParseFailure },

    /// The iteration bound was hit.
    Truncated { iterations: usize },
}

impl TurnEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ContextRecalled { .. } => "context_recalled",
            Self::Thinking { .. } => "thinking",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::ParseFailure { .. } => "parse_failure",
            Self::Truncated { .. } => "truncated",
        }
    }
}
