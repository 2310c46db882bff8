//! SQLite-backed chunk store with exact cosine search.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use ordered_float::OrderedFloat;
use rusqlite::{params, Connection};
use tracing::{debug, info};

use crate::error::{ErrorCode, ZhimiError, ZhimiResult};
use crate::traits::{cosine_similarity, normalize, DocumentIndex, Embedder};
use crate::types::{Chunk, ScoredChunk};

const DEFAULT_BATCH_SIZE: usize = 32;

/// Persisted chunk collection. Embeddings are stored unit-length alongside
/// each chunk; search scans every row.
pub struct SqliteChunkIndex {
    conn: Arc<Mutex<Connection>>,
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
}

impl SqliteChunkIndex {
    /// Open (or create) the index at `db_path`. `":memory:"` opens a
    /// private in-memory database.
    pub fn open(db_path: impl AsRef<Path>, embedder: Arc<dyn Embedder>) -> ZhimiResult<Self> {
        let db_path = db_path.as_ref();

        let conn = if db_path.to_str() == Some(":memory:") {
            Connection::open_in_memory()
        } else {
            if let Some(parent) = db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            Connection::open(db_path)
        }
        .map_err(|e| ZhimiError::Database {
            message: format!("Failed to open chunk index: {}", e),
            code: ErrorCode::DbConnectionFailed,
            source: Some(Box::new(e)),
        })?;

        let index = Self {
            conn: Arc::new(Mutex::new(conn)),
            embedder,
            batch_size: DEFAULT_BATCH_SIZE,
        };
        index.create_table()?;

        Ok(index)
    }

    pub fn in_memory(embedder: Arc<dyn Embedder>) -> ZhimiResult<Self> {
        Self::open(":memory:", embedder)
    }

    /// Texts per embedding request during [`rebuild`](Self::rebuild).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    fn create_table(&self) -> ZhimiResult<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id         TEXT PRIMARY KEY,
                ordinal    INTEGER NOT NULL,
                content    TEXT NOT NULL,
                source     TEXT,
                metadata   TEXT NOT NULL DEFAULT '{}',
                embedding  TEXT NOT NULL
            )
            "#,
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_chunks_ordinal ON chunks(ordinal)",
            [],
        )?;
        Ok(())
    }

    /// Replace the whole collection with `chunks`.
    ///
    /// Every chunk is embedded before the table is touched, so a failed
    /// embedding call leaves the previous index intact.
    pub async fn rebuild(&self, chunks: &[Chunk]) -> ZhimiResult<usize> {
        let mut embeddings = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts).await?;
            if vectors.len() != texts.len() {
                return Err(ZhimiError::embedding(format!(
                    "Embedder returned {} vectors for {} texts",
                    vectors.len(),
                    texts.len()
                )));
            }
            embeddings.extend(vectors);
            debug!(done = embeddings.len(), total = chunks.len(), "Embedded batch");
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM chunks", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO chunks (id, ordinal, content, source, metadata, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for (ordinal, (chunk, mut vector)) in chunks.iter().zip(embeddings).enumerate() {
                normalize(&mut vector);
                stmt.execute(params![
                    chunk.id,
                    ordinal as i64,
                    chunk.content,
                    chunk.source,
                    serde_json::to_string(&chunk.metadata)?,
                    serde_json::to_string(&vector)?,
                ])?;
            }
        }
        tx.commit()?;

        info!(chunks = chunks.len(), model = self.embedder.model_name(), "Rebuilt chunk index");
        Ok(chunks.len())
    }

    pub fn len(&self) -> ZhimiResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> ZhimiResult<bool> {
        Ok(self.len()? == 0)
    }

    fn conn(&self) -> ZhimiResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ZhimiError::Internal("chunk index lock poisoned".to_string()))
    }
}

fn row_to_chunk(row: &rusqlite::Row<'_>) -> rusqlite::Result<(Chunk, String)> {
    let metadata: String = row.get(3)?;
    let chunk = Chunk {
        id: row.get(0)?,
        content: row.get(1)?,
        source: row.get(2)?,
        metadata: serde_json::from_str::<HashMap<String, serde_json::Value>>(&metadata)
            .unwrap_or_default(),
    };
    Ok((chunk, row.get(4)?))
}

#[async_trait]
impl DocumentIndex for SqliteChunkIndex {
    async fn chunks(&self) -> ZhimiResult<Vec<Chunk>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, content, source, metadata, embedding FROM chunks ORDER BY ordinal",
        )?;
        let chunks = stmt
            .query_map([], row_to_chunk)?
            .map(|row| row.map(|(chunk, _)| chunk))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(chunks)
    }

    async fn similarity_search(&self, query: &str, k: usize) -> ZhimiResult<Vec<ScoredChunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        // Embed before taking the lock.
        let mut query_vector = self.embedder.embed(query).await?;
        normalize(&mut query_vector);

        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, content, source, metadata, embedding FROM chunks ORDER BY ordinal",
        )?;
        let rows = stmt
            .query_map([], row_to_chunk)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut scored = Vec::with_capacity(rows.len());
        for (chunk, embedding) in rows {
            let vector: Vec<f32> = serde_json::from_str(&embedding)?;
            if vector.len() != query_vector.len() {
                return Err(ZhimiError::Index {
                    message: format!(
                        "Query embedding has {} dimensions, index has {}",
                        query_vector.len(),
                        vector.len()
                    ),
                    code: ErrorCode::IdxDimensionMismatch,
                    source: None,
                });
            }
            let score = cosine_similarity(&query_vector, &vector);
            scored.push(ScoredChunk { chunk, score });
        }

        // Stable: equal scores keep index order.
        scored.sort_by_key(|s| std::cmp::Reverse(OrderedFloat(s.score)));
        scored.truncate(k);
        Ok(scored)
    }
}
