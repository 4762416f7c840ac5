//! Model endpoint implementations for toolpilot.
//!
//! All providers implement the `toolpilot_core::Provider` trait.

pub mod ollama;

pub use ollama::{OLLAMA_API_BASE_URL, OllamaProvider};
