//! In-memory context store, used in tests and ephemeral sessions.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use toolpilot_core::error::StoreError;
use toolpilot_core::memory::{ContextRecord, ContextStore};

use crate::vector;

/// A context store that keeps records in a Vec, in insertion order.
#[derive(Clone)]
pub struct InMemoryStore {
    records: Arc<RwLock<Vec<ContextRecord>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContextStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn put(&self, record: ContextRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if records.iter().any(|r| r.id == record.id) {
            return Err(StoreError::Duplicate(record.id));
        }
        records.push(record);
        Ok(())
    }

    async fn query(&self, embedding: &[f32], limit: usize) -> Result<Vec<ContextRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(vector::vector_search(records.iter(), embedding, limit))
    }

    async fn session_records(&self, session_id: &str) -> Result<Vec<ContextRecord>, StoreError> {
        let mut matching: Vec<ContextRecord> = self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect();
        // stable: equal sequences keep insertion order
        matching.sort_by_key(|r| r.sequence);
        Ok(matching)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.records.read().await.len())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.records.write().await.clear();
        Ok(())
    }
}
