//! Document ingestion pipeline.
//!
//! Takes a raw uploaded document and makes it searchable:
//!
//! 1. Extract page texts ([`crate::extract`]).
//! 2. Normalize each page ([`crate::normalize::clean_text`]).
//! 3. Chunk into passages ([`crate::chunk`]).
//! 4. Remove previously indexed passages for the same source key, then
//!    upsert the new passages in batches.
//!
//! Passage ids are `<source>_<ordinal>` over the whole document, so a
//! re-ingest of identical content writes the same ids. Concurrent ingests
//! of the same source key serialize on a per-source async lock; different
//! source keys proceed in parallel.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

use crate::chunk::split_pages;
use crate::config::{ChunkingConfig, EmbeddingConfig};
use crate::extract::extract_pages;
use crate::index::{IndexEntry, VectorIndex};
use crate::models::ChunkMeta;
use crate::normalize::clean_text;

/// Chunks and indexes uploaded documents.
pub struct Ingestor {
    chunking: ChunkingConfig,
    batch_size: usize,
    locks: StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl Ingestor {
    pub fn new(chunking: ChunkingConfig, embedding: &EmbeddingConfig) -> Self {
        Self {
            chunking,
            batch_size: embedding.batch_size,
            locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Ingest one document under `source` and return the number of
    /// passages indexed. Zero passages (an empty or all-garbage document)
    /// is a success.
    ///
    /// # Errors
    ///
    /// Fails on unsupported content types, extraction failures, and
    /// upsert (embedding) failures. A failed upsert can leave the source
    /// partially indexed; re-ingesting repairs it.
    pub async fn ingest(
        &self,
        index: &dyn VectorIndex,
        source: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<usize> {
        let pages = extract_pages(bytes, content_type)
            .with_context(|| format!("Failed to extract '{}'", source))?;

        let cleaned: Vec<(String, usize)> = pages
            .into_iter()
            .map(|(text, page)| (clean_text(&text), page))
            .collect();

        let passages = split_pages(&cleaned, &self.chunking);

        let lock = self.source_lock(source);
        let _guard = lock.lock().await;

        // Best-effort removal of the previous version. A failure here is
        // logged, not fatal: the upsert below overwrites matching ids.
        if let Err(e) = index.delete_by_source(source).await {
            warn!(source, error = %e, "failed to delete existing passages before re-ingest");
        }

        let entries: Vec<IndexEntry> = passages
            .into_iter()
            .enumerate()
            .map(|(ordinal, p)| IndexEntry {
                id: format!("{}_{}", source, ordinal),
                meta: ChunkMeta {
                    source: source.to_string(),
                    page: p.page,
                    chunk_index: ordinal,
                },
                text: p.text,
            })
            .collect();

        let total = entries.len();

        for batch in entries.chunks(self.batch_size) {
            index
                .upsert(batch.to_vec())
                .await
                .with_context(|| format!("Failed to index passages for '{}'", source))?;
        }

        info!(source, passages = total, "document ingested");
        Ok(total)
    }

    /// Remove every indexed passage for `source`.
    pub async fn remove(&self, index: &dyn VectorIndex, source: &str) -> Result<usize> {
        let lock = self.source_lock(source);
        let _guard = lock.lock().await;
        let removed = index.delete_by_source(source).await?;
        info!(source, removed, "document removed from index");
        Ok(removed)
    }

    fn source_lock(&self, source: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(source.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}
