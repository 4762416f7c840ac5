//! The conversation loop of toolpilot.
//!
//! A turn follows a **Collect → Infer → Parse → Act → Respond → Persist** cycle:
//!
//! 1. **Collect** similar past exchanges and build the system prompt
//! 2. **Infer** by sending the transcript to the model
//! 3. **Parse** `<tool_call>` blocks out of the reply
//! 4. **Act** on them in source order, feeding results back to step 2
//! 5. **Respond** once the model answers without calling a tool
//! 6. **Persist** the exchange, with its embedding, for later recall
//!
//! The Infer/Act cycle stops after a fixed number of model calls.

pub mod executor;
pub mod loop_runner;
pub mod parser;
pub mod prompt;
pub mod retriever;
pub mod stream_event;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use executor::ToolExecutor;
pub use loop_runner::{AgentLoop, TRUNCATION_NOTICE, TurnError, TurnOutcome};
pub use parser::{ParseFailure, ParseFailureReason, ParsedResponse, parse};
pub use retriever::{ContextRetriever, RetrievalError, RetrieverConfig};
pub use stream_event::TurnEvent;
