//! SQLite context store.
//!
//! One table, `contexts`, holds every persisted exchange with its embedding
//! as a little-endian `f32` blob. Rows are only ever inserted; nearest
//! neighbours are found by a cosine scan in [`crate::vector`].

use crate::vector;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use toolpilot_core::error::StoreError;
use toolpilot_core::memory::{ContextRecord, ContextStore};
use tracing::{debug, info};

/// A persistent SQLite context store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the store at `path`.
    ///
    /// Parent directories, the database file, and the schema are created
    /// automatically.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StoreError::Storage(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite context store initialized at {}", path.display());
        Ok(store)
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS contexts (
                iid          INTEGER PRIMARY KEY AUTOINCREMENT,
                id           TEXT UNIQUE NOT NULL,
                session_id   TEXT NOT NULL,
                sequence     INTEGER NOT NULL,
                prompt       TEXT NOT NULL,
                response     TEXT NOT NULL,
                created_at   TEXT NOT NULL,
                embedding    BLOB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("contexts table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_contexts_session ON contexts(session_id, sequence)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("session index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<ContextRecord, StoreError> {
        let column = |name: &str, e: sqlx::Error| StoreError::QueryFailed(format!("{name} column: {e}"));

        let id: String = row.try_get("id").map_err(|e| column("id", e))?;
        let session_id: String = row.try_get("session_id").map_err(|e| column("session_id", e))?;
        let sequence: i64 = row.try_get("sequence").map_err(|e| column("sequence", e))?;
        let prompt: String = row.try_get("prompt").map_err(|e| column("prompt", e))?;
        let response: String = row.try_get("response").map_err(|e| column("response", e))?;
        let created_at_str: String = row.try_get("created_at").map_err(|e| column("created_at", e))?;
        let blob: Vec<u8> = row.try_get("embedding").map_err(|e| column("embedding", e))?;

        let created_at = chrono::DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StoreError::QueryFailed(format!("created_at value '{created_at_str}': {e}")))?;

        Ok(ContextRecord {
            id,
            session_id,
            sequence: u64::try_from(sequence).unwrap_or_default(),
            prompt,
            response,
            created_at,
            embedding: Self::blob_to_embedding(&blob),
            similarity: None,
        })
    }

    fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
        blob.chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    async fn fetch_all(&self, sql: &str, bind: Option<&str>) -> Result<Vec<ContextRecord>, StoreError> {
        let mut query = sqlx::query(sql);
        if let Some(value) = bind {
            query = query.bind(value);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        rows.iter().map(Self::row_to_record).collect()
    }
}

#[async_trait]
impl ContextStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn put(&self, record: ContextRecord) -> Result<(), StoreError> {
        let sequence = i64::try_from(record.sequence)
            .map_err(|_| StoreError::Storage(format!("sequence {} out of range", record.sequence)))?;

        let result = sqlx::query(
            r#"
            INSERT INTO contexts (id, session_id, sequence, prompt, response, created_at, embedding)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.session_id)
        .bind(sequence)
        .bind(&record.prompt)
        .bind(&record.response)
        .bind(record.created_at.to_rfc3339())
        .bind(Self::embedding_to_blob(&record.embedding))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                debug!(id = %record.id, session = %record.session_id, sequence = record.sequence, "Stored context record");
                Ok(())
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::Duplicate(record.id))
            }
            Err(e) => Err(StoreError::Storage(format!("Insert failed: {e}"))),
        }
    }

    async fn query(&self, embedding: &[f32], limit: usize) -> Result<Vec<ContextRecord>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let records = self
            .fetch_all(
                "SELECT id, session_id, sequence, prompt, response, created_at, embedding FROM contexts",
                None,
            )
            .await?;

        let results = vector::vector_search(&records, embedding, limit);
        debug!(scanned = records.len(), returned = results.len(), "Vector query complete");
        Ok(results)
    }

    async fn session_records(&self, session_id: &str) -> Result<Vec<ContextRecord>, StoreError> {
        self.fetch_all(
            "SELECT id, session_id, sequence, prompt, response, created_at, embedding \
             FROM contexts WHERE session_id = ? ORDER BY sequence ASC, iid ASC",
            Some(session_id),
        )
        .await
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM contexts")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;
        let n: i64 = row
            .try_get("n")
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;
        Ok(usize::try_from(n).unwrap_or_default())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM contexts")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("Clear failed: {e}")))?;
        info!("Context store cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store(dir: &tempfile::TempDir) -> SqliteStore {
        SqliteStore::open(&dir.path().join("conversations.sqlite"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn put_and_count() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir).await;
        assert_eq!(store.count().await.unwrap(), 0);

        store
            .put(ContextRecord::new("s1", 1, "hello", "hi there", vec![1.0, 0.0]))
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("db").join("conversations.sqlite");
        let store = SqliteStore::open(&path).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn embedding_survives_storage() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir).await;
        let embedding = vec![0.25, -1.5, 3.0, 0.0];
        store
            .put(ContextRecord::new("s1", 1, "q", "a", embedding.clone()))
            .await
            .unwrap();

        let records = store.session_records("s1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].embedding, embedding);
        assert_eq!(records[0].prompt, "q");
        assert_eq!(records[0].response, "a");
    }

    #[tokio::test]
    async fn query_ranks_by_similarity() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir).await;
        store.put(ContextRecord::new("s1", 1, "far", "x", vec![0.0, 1.0])).await.unwrap();
        store.put(ContextRecord::new("s1", 2, "near", "x", vec![1.0, 0.0])).await.unwrap();
        store.put(ContextRecord::new("s1", 3, "mid", "x", vec![1.0, 1.0])).await.unwrap();

        let results = store.query(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].prompt, "near");
        assert_eq!(results[1].prompt, "mid");
        assert!(results[0].similarity.unwrap() > results[1].similarity.unwrap());
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected_and_original_kept() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir).await;
        let original = ContextRecord::new("s1", 1, "original", "kept", vec![1.0]);
        let mut clash = ContextRecord::new("s1", 2, "replacement", "lost", vec![1.0]);
        clash.id = original.id.clone();

        store.put(original).await.unwrap();
        let err = store.put(clash).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));

        let records = store.session_records("s1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].prompt, "original");
    }

    #[tokio::test]
    async fn session_records_are_in_sequence_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir).await;
        for seq in 1..=3 {
            store
                .put(ContextRecord::new("s1", seq, format!("p{seq}"), "r", vec![1.0]))
                .await
                .unwrap();
        }
        store.put(ContextRecord::new("other", 1, "elsewhere", "r", vec![1.0])).await.unwrap();

        let records = store.session_records("s1").await.unwrap();
        let sequences: Vec<_> = records.iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn records_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = test_store(&dir).await;
            store.put(ContextRecord::new("s1", 1, "remember me", "ok", vec![1.0])).await.unwrap();
        }
        let store = test_store(&dir).await;
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir).await;
        store.put(ContextRecord::new("s1", 1, "a", "b", vec![1.0])).await.unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
