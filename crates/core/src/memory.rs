//! The ContextStore trait: persistent storage of past exchanges.
//!
//! Every finished exchange (user prompt + final reply) is stored once with
//! its embedding. Later turns query the store by vector similarity to
//! recall relevant history.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;

/// A persisted exchange plus its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextRecord {
    /// Unique ID for this record
    pub id: String,

    /// Session the exchange belongs to
    pub session_id: String,

    /// Position of the exchange within its session, starting at 1
    pub sequence: u64,

    /// What the user said
    pub prompt: String,

    /// What the assistant finally answered
    pub response: String,

    /// When this record was created
    pub created_at: DateTime<Utc>,

    /// Embedding vector (stored as blob in DB)
    #[serde(skip)]
    pub embedding: Vec<f32>,

    /// Similarity to the query, set only on query results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
}

impl ContextRecord {
    pub fn new(
        session_id: impl Into<String>,
        sequence: u64,
        prompt: impl Into<String>,
        response: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            sequence,
            prompt: prompt.into(),
            response: response.into(),
            created_at: Utc::now(),
            embedding,
            similarity: None,
        }
    }

    /// The text that gets embedded for this exchange.
    pub fn embedding_text(prompt: &str, response: &str) -> String {
        format!("{prompt} {response}")
    }
}

/// The core ContextStore trait.
///
/// Stores are append-only: `put` never replaces an existing record.
/// Implementations: SQLite, in-memory (for testing).
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Store a new record. Fails with [`StoreError::Duplicate`] if the ID exists.
    async fn put(&self, record: ContextRecord) -> std::result::Result<(), StoreError>;

    /// The `limit` records most similar to `embedding`, most similar first,
    /// with `similarity` set.
    async fn query(&self, embedding: &[f32], limit: usize) -> std::result::Result<Vec<ContextRecord>, StoreError>;

    /// All records of one session, in sequence order.
    async fn session_records(&self, session_id: &str) -> std::result::Result<Vec<ContextRecord>, StoreError>;

    /// Get total record count.
    async fn count(&self) -> std::result::Result<usize, StoreError>;

    /// Remove every record.
    async fn clear(&self) -> std::result::Result<(), StoreError>;
}
