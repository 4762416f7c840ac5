//! Tool invocation parser.
//!
//! Models announce tool calls inline, as JSON wrapped in tags:
//!
//! ```text
//! Let me look that up.
//! <tool_call>
//! {"name": "search", "arguments": {"query": "latest ollama tools"}}
//! </tool_call>
//! ```
//!
//! [`parse`] extracts every well-formed block in source order. A malformed
//! block is recorded as a [`ParseFailure`] and skipped; it never stops the
//! blocks after it from being read.

use serde::Serialize;
use serde_json::{Map, Value};
use toolpilot_core::tool::ToolCallRequest;
use tracing::warn;

pub const TOOL_CALL_OPEN: &str = "<tool_call>";
pub const TOOL_CALL_CLOSE: &str = "</tool_call>";
const TOOL_RESPONSE_OPEN: &str = "<tool_response>";
const TOOL_RESPONSE_CLOSE: &str = "</tool_response>";

/// Everything extracted from one model reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedResponse {
    /// Prose outside the tool-call blocks
    pub text: String,
    /// Well-formed requests, in source order
    pub calls: Vec<ToolCallRequest>,
    /// One entry per skipped block
    pub failures: Vec<ParseFailure>,
}

impl ParsedResponse {
    /// No tool was requested: the reply is a plain answer.
    pub fn is_plain_answer(&self) -> bool {
        self.calls.is_empty()
    }
}

/// A tool-call block that could not be turned into a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseFailure {
    /// Zero-based position of the block among all blocks in the reply
    pub index: usize,
    pub reason: ParseFailureReason,
    /// The block body as written by the model
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ParseFailureReason {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("block is not a JSON object")]
    NotAnObject,

    #[error("missing or empty 'name'")]
    MissingName,

    #[error("invalid 'arguments': {0}")]
    InvalidArguments(String),

    #[error("opening <tool_call> has no matching </tool_call>")]
    MissingCloseTag,
}

/// Parse a raw model reply.
pub fn parse(raw: &str) -> ParsedResponse {
    let mut parsed = ParsedResponse::default();
    let mut text_parts = Vec::new();
    let mut remaining = raw;
    let mut index = 0;

    while let Some(start) = remaining.find(TOOL_CALL_OPEN) {
        text_parts.push(&remaining[..start]);

        let after_open = &remaining[start + TOOL_CALL_OPEN.len()..];
        let Some(close_idx) = after_open.find(TOOL_CALL_CLOSE) else {
            let failure = ParseFailure {
                index,
                reason: ParseFailureReason::MissingCloseTag,
                raw: after_open.trim().to_string(),
            };
            warn!(index, "Unterminated <tool_call> block");
            parsed.failures.push(failure);
            remaining = "";
            break;
        };

        // another block opens before this one closes: this one is unterminated
        if let Some(next_open) = after_open[..close_idx].find(TOOL_CALL_OPEN) {
            warn!(index, "Unterminated <tool_call> block skipped");
            parsed.failures.push(ParseFailure {
                index,
                reason: ParseFailureReason::MissingCloseTag,
                raw: after_open[..next_open].trim().to_string(),
            });
            index += 1;
            remaining = &after_open[next_open..];
            continue;
        }

        let body = after_open[..close_idx].trim();
        match parse_block(body) {
            Ok(call) => parsed.calls.push(call),
            Err(reason) => {
                warn!(index, %reason, "Malformed <tool_call> block skipped");
                parsed.failures.push(ParseFailure {
                    index,
                    reason,
                    raw: body.to_string(),
                });
            }
        }

        index += 1;
        remaining = &after_open[close_idx + TOOL_CALL_CLOSE.len()..];
    }
    text_parts.push(remaining);

    parsed.text = text_parts
        .into_iter()
        .map(strip_tool_responses)
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    parsed
}

fn parse_block(body: &str) -> Result<ToolCallRequest, ParseFailureReason> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| ParseFailureReason::InvalidJson(e.to_string()))?;

    let Value::Object(object) = value else {
        return Err(ParseFailureReason::NotAnObject);
    };

    let name = object
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or(ParseFailureReason::MissingName)?;

    // some models write "parameters" instead of "arguments"
    let arguments = match object.get("arguments").or_else(|| object.get("parameters")) {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(Value::String(encoded)) => match serde_json::from_str::<Value>(encoded) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                return Err(ParseFailureReason::InvalidArguments(
                    "encoded arguments are not an object".into(),
                ));
            }
            Err(e) => return Err(ParseFailureReason::InvalidArguments(e.to_string())),
        },
        Some(other) => {
            return Err(ParseFailureReason::InvalidArguments(format!(
                "expected an object, got {}",
                json_type(other)
            )));
        }
    };

    Ok(ToolCallRequest::new(name, arguments))
}

/// Remove `<tool_response>` blocks the model invented itself.
fn strip_tool_responses(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut remaining = text;

    while let Some(start) = remaining.find(TOOL_RESPONSE_OPEN) {
        out.push_str(&remaining[..start]);
        let after_open = &remaining[start + TOOL_RESPONSE_OPEN.len()..];
        match after_open.find(TOOL_RESPONSE_CLOSE) {
            Some(close) => remaining = &after_open[close + TOOL_RESPONSE_CLOSE.len()..],
            None => {
                remaining = "";
                break;
            }
        }
    }
    out.push_str(remaining);
    out
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
