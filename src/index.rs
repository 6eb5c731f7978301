//! Vector index abstraction and the in-memory implementation.
//!
//! A [`VectorIndex`] stores embedded passages keyed by a stable id and
//! answers nearest-neighbor queries by cosine distance. The index owns its
//! [`Embedder`]: callers hand over plain text on both the write and the
//! read path, so all vectors in one index come from one embedding space.
//!
//! [`MemoryIndex`] is the process-local implementation. Contents do not
//! survive a restart; durability of the underlying documents is the
//! caller's concern.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::embedding::{cosine_distance, embed_query, Embedder};
use crate::models::{ChunkMeta, RetrievedChunk};

/// One passage handed to [`VectorIndex::upsert`].
#[derive(Debug, Clone)]
pub struct IndexEntry {
    /// Stable id, unique within the index. Re-upserting an id replaces
    /// the stored record.
    pub id: String,
    pub text: String,
    pub meta: ChunkMeta,
}

/// An embedded-passage store queried by semantic similarity.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Embed and store a batch of passages. Existing ids are replaced.
    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<()>;

    /// Remove every record whose metadata source equals `source`.
    /// Returns the number of records removed.
    async fn delete_by_source(&self, source: &str) -> Result<usize>;

    /// Return up to `k` stored passages nearest to `text`, ordered by
    /// ascending cosine distance. An empty index yields an empty result
    /// without embedding the query.
    async fn query(&self, text: &str, k: usize) -> Result<Vec<RetrievedChunk>>;

    /// Number of records currently stored.
    async fn count(&self) -> usize;
}

struct Record {
    vector: Vec<f32>,
    text: String,
    meta: ChunkMeta,
}

/// In-memory [`VectorIndex`] backed by a `HashMap` behind an async
/// read-write lock.
pub struct MemoryIndex {
    embedder: Box<dyn Embedder>,
    records: RwLock<HashMap<String, Record>>,
}

impl MemoryIndex {
    pub fn new(embedder: Box<dyn Embedder>) -> Self {
        Self {
            embedder,
            records: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = entries.iter().map(|e| e.text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;

        if vectors.len() != entries.len() {
            anyhow::bail!(
                "embedder returned {} vectors for {} texts",
                vectors.len(),
                entries.len()
            );
        }

        let mut records = self.records.write().await;
        for (entry, vector) in entries.into_iter().zip(vectors) {
            records.insert(
                entry.id,
                Record {
                    vector,
                    text: entry.text,
                    meta: entry.meta,
                },
            );
        }

        Ok(())
    }

    async fn delete_by_source(&self, source: &str) -> Result<usize> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, r| r.meta.source != source);
        Ok(before - records.len())
    }

    async fn query(&self, text: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        // Check emptiness first so an empty index never costs an
        // embedding call.
        if self.records.read().await.is_empty() {
            return Ok(Vec::new());
        }

        let query_vec = embed_query(self.embedder.as_ref(), text).await?;

        let records = self.records.read().await;
        let mut hits: Vec<RetrievedChunk> = records
            .values()
            .map(|r| RetrievedChunk {
                text: r.text.clone(),
                distance: cosine_distance(&query_vec, &r.vector),
                meta: r.meta.clone(),
            })
            .collect();

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        Ok(hits)
    }

    async fn count(&self) -> usize {
        self.records.read().await.len()
    }
}
