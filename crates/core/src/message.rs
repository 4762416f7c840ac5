//! Turn and Session domain types.
//!
//! These are the core value objects that flow through the whole system:
//! the user types a line → it becomes a [`Turn`] → the agent loop appends
//! assistant and tool turns → the finished exchange is committed to the
//! [`Session`] and persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tool::ToolResult;

/// Unique identifier for a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a turn's author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions
    System,
    /// The end user
    User,
    /// The language model
    Assistant,
    /// Tool execution result
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// A single unit of conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Unique turn ID
    pub id: String,

    /// Who produced this turn
    pub role: Role,

    /// The text content (for tool turns, the rendered result)
    pub content: String,

    /// The structured result, for tool turns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<ToolResult>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            tool_result: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a new user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create a new assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Create a new system turn.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    /// Create a tool turn carrying a structured result.
    ///
    /// The content is the result rendered the way the model sees it.
    pub fn tool(result: ToolResult) -> Self {
        let mut turn = Self::with_role(Role::Tool, result.render_for_model());
        turn.tool_result = Some(result);
        turn
    }
}

/// An ordered, append-only sequence of turns for one interaction stream.
///
/// Turns can only be added with [`Session::push`]; there is no way to
/// remove, reorder, or replace a committed turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique session ID
    pub id: SessionId,

    turns: Vec<Turn>,

    /// Number of exchanges (user input + final reply) committed so far
    exchanges: u64,

    /// When this session was created
    pub created_at: DateTime<Utc>,

    /// When the last turn was added
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a new empty session.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            turns: Vec::new(),
            exchanges: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a turn.
    ///
    /// A timestamp earlier than the last committed turn's is raised to it,
    /// so turn order and timestamp order always agree.
    pub fn push(&mut self, mut turn: Turn) {
        if let Some(last) = self.turns.last()
            && turn.timestamp < last.timestamp
        {
            turn.timestamp = last.timestamp;
        }
        self.updated_at = Utc::now().max(turn.timestamp);
        self.turns.push(turn);
    }

    /// Append a finished exchange and return its sequence number.
    pub fn commit_exchange(&mut self, turns: impl IntoIterator<Item = Turn>) -> u64 {
        for turn in turns {
            self.push(turn);
        }
        self.exchanges += 1;
        self.exchanges
    }

    /// All committed turns, oldest first.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Up to `n` of the latest non-system turns, oldest first.
    ///
    /// The window always starts at a user turn, so no exchange is replayed
    /// without the input that began it.
    pub fn recent(&self, n: usize) -> Vec<Turn> {
        let mut recent: Vec<Turn> = self
            .turns
            .iter()
            .rev()
            .filter(|t| t.role != Role::System)
            .take(n)
            .cloned()
            .collect();
        recent.reverse();

        let start = recent
            .iter()
            .position(|t| t.role == Role::User)
            .unwrap_or(recent.len());
        recent.split_off(start)
    }

    /// Number of committed exchanges.
    pub fn exchange_count(&self) -> u64 {
        self.exchanges
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
