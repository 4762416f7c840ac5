//! Context store implementations for toolpilot.

pub mod in_memory;
pub mod vector;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemoryStore;
pub use vector::{cosine_similarity, vector_search};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
