//! # toolpilot Core
//!
//! Domain types, traits, and error definitions for the toolpilot assistant.
//! This crate performs **no I/O**. It defines the domain model that the
//! provider, memory, tool, and agent crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here:
//! - [`Provider`] — the language model and embedding endpoint
//! - [`ContextStore`] — the persistent vector store for past exchanges
//! - [`SearchProvider`] — the web search backend
//! - [`Tool`] — a named capability the model may invoke
//!
//! Implementations live in their respective crates and are chosen from
//! configuration at start-up.

pub mod error;
pub mod memory;
pub mod message;
pub mod provider;
pub mod search;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{ProviderError, SearchError, StoreError, ToolError};
pub use memory::{ContextRecord, ContextStore};
pub use message::{Role, Session, SessionId, Turn};
pub use provider::{EmbeddingRequest, EmbeddingResponse, Provider, ProviderRequest, ProviderResponse};
pub use search::{SearchHit, SearchProvider};
pub use tool::{
    ArgumentSchema, FailureKind, ParamKind, ParamSpec, Tool, ToolCallRequest, ToolOutput,
    ToolRegistry, ToolResult, ToolSpec,
};
