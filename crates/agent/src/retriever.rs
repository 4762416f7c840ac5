//! Context retrieval: recall similar past exchanges and remember new ones.
//!
//! The retriever embeds text through the [`Provider`] and reads/writes
//! [`ContextRecord`]s through the [`ContextStore`]. Every remote call runs
//! under the configured timeout; a timeout or failure is reported as
//! [`RetrievalError::Unavailable`] so the caller can retry the turn.

use std::sync::Arc;
use std::time::Duration;
use toolpilot_core::memory::{ContextRecord, ContextStore};
use toolpilot_core::provider::{EmbeddingRequest, Provider};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    /// Maximum records returned per query (N)
    pub result_limit: usize,
    /// Minimum similarity a record needs to be returned (T)
    pub similarity_threshold: f32,
    pub embed_model: String,
    pub timeout: Duration,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            result_limit: 3,
            similarity_threshold: 0.7,
            embed_model: "nomic-embed-text".into(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("Context retrieval unavailable: {0}")]
    Unavailable(String),
}

impl RetrievalError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

pub struct ContextRetriever {
    provider: Arc<dyn Provider>,
    store: Arc<dyn ContextStore>,
    config: RetrieverConfig,
}

impl ContextRetriever {
    pub fn new(
        provider: Arc<dyn Provider>,
        store: Arc<dyn ContextStore>,
        config: RetrieverConfig,
    ) -> Self {
        Self {
            provider,
            store,
            config,
        }
    }

    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ContextStore> {
        &self.store
    }

    /// Records similar to `query`: at most N, all at or above T, most
    /// similar first.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ContextRecord>, RetrievalError> {
        if self.config.result_limit == 0 {
            return Ok(Vec::new());
        }

        let embedding = self.embed(query).await?;

        let candidates = tokio::time::timeout(
            self.config.timeout,
            self.store.query(&embedding, self.config.result_limit),
        )
        .await
        .map_err(|_| self.timed_out("store query"))?
        .map_err(|e| RetrievalError::Unavailable(format!("store query failed: {e}")))?;

        let threshold = self.config.similarity_threshold;
        let mut records: Vec<ContextRecord> = candidates
            .into_iter()
            .filter(|r| r.similarity.is_some_and(|s| s >= threshold))
            .collect();
        records.sort_by(|a, b| {
            b.similarity
                .unwrap_or(0.0)
                .total_cmp(&a.similarity.unwrap_or(0.0))
        });
        records.truncate(self.config.result_limit);

        debug!(
            store = self.store.name(),
            returned = records.len(),
            threshold,
            "Retrieved context"
        );
        Ok(records)
    }

    /// Embed and store one finished exchange.
    pub async fn remember(
        &self,
        session_id: &str,
        sequence: u64,
        prompt: &str,
        response: &str,
    ) -> Result<ContextRecord, RetrievalError> {
        let embedding = self
            .embed(&ContextRecord::embedding_text(prompt, response))
            .await?;
        let record = ContextRecord::new(session_id, sequence, prompt, response, embedding);

        tokio::time::timeout(self.config.timeout, self.store.put(record.clone()))
            .await
            .map_err(|_| self.timed_out("store write"))?
            .map_err(|e| RetrievalError::Unavailable(format!("store write failed: {e}")))?;

        debug!(session_id, sequence, record_id = %record.id, "Stored exchange");
        Ok(record)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        let request = EmbeddingRequest {
            model: self.config.embed_model.clone(),
            inputs: vec![text.to_string()],
        };

        let response = tokio::time::timeout(self.config.timeout, self.provider.embed(request))
            .await
            .map_err(|_| self.timed_out("embedding"))?
            .map_err(|e| RetrievalError::Unavailable(format!("embedding failed: {e}")))?;

        response
            .embeddings
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| RetrievalError::Unavailable("embedding endpoint returned no vector".into()))
    }

    fn timed_out(&self, what: &str) -> RetrievalError {
        RetrievalError::Unavailable(format!(
            "{what} timed out after {}ms",
            self.config.timeout.as_millis()
        ))
    }
}
