//! Context retrieval for question answering.
//!
//! [`retrieve_context`] turns a user question into a formatted context
//! block: query the index for nearest passages, keep the relevant ones,
//! and render each with a source attribution header. Retrieval is
//! best-effort by contract: any fault (index, embedder) is logged and
//! yields an empty context, so the conversation can still proceed on the
//! model's general knowledge.
//!
//! # Relevance Policy
//!
//! 1. Request `candidate_k` nearest passages.
//! 2. Keep those with cosine distance strictly below the threshold.
//! 3. If none qualify, fall back to the first `fallback_k` raw hits
//!    rather than answering with no grounding at all.
//! 4. Sort ascending by distance and keep at most `context_limit`.

use tracing::warn;

use crate::config::RetrievalConfig;
use crate::index::VectorIndex;
use crate::models::RetrievedChunk;

/// Separator between rendered passages in the context block.
const BLOCK_SEPARATOR: &str = "\n\n---\n\n";

/// Retrieve and format grounding context for `question`.
///
/// Returns an empty string when the index is empty, when nothing is
/// retrievable, or when retrieval fails. Never returns an error.
pub async fn retrieve_context(
    index: &dyn VectorIndex,
    opts: &RetrievalConfig,
    question: &str,
) -> String {
    let hits = match index.query(question, opts.candidate_k).await {
        Ok(hits) => hits,
        Err(e) => {
            warn!(error = %e, "context retrieval failed, answering without context");
            return String::new();
        }
    };

    if hits.is_empty() {
        return String::new();
    }

    let selected = select_relevant(hits, opts);

    selected
        .iter()
        .map(render_block)
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}

fn select_relevant(hits: Vec<RetrievedChunk>, opts: &RetrievalConfig) -> Vec<RetrievedChunk> {
    let mut relevant: Vec<RetrievedChunk> = hits
        .iter()
        .filter(|h| h.distance < opts.distance_threshold)
        .cloned()
        .collect();

    if relevant.is_empty() {
        // Weak matches beat no grounding; keep the leading raw hits.
        relevant = hits.into_iter().take(opts.fallback_k).collect();
    }

    relevant.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    relevant.truncate(opts.context_limit);
    relevant
}

fn render_block(chunk: &RetrievedChunk) -> String {
    format!(
        "[Source: {}, Page {}]\n{}",
        display_name(&chunk.meta.source),
        chunk.meta.page + 1,
        chunk.text
    )
}

/// Human-readable name for a source key: the last path segment, without a
/// trailing `.pdf` extension.
fn display_name(source: &str) -> &str {
    let name = source.rsplit('/').next().unwrap_or(source);
    name.strip_suffix(".pdf").unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkMeta;
    use anyhow::Result;
    use async_trait::async_trait;

    struct FixedIndex {
        hits: Vec<RetrievedChunk>,
        fail: bool,
    }

    #[async_trait]
    impl VectorIndex for FixedIndex {
        async fn upsert(&self, _entries: Vec<crate::index::IndexEntry>) -> Result<()> {
            Ok(())
        }

        async fn delete_by_source(&self, _source: &str) -> Result<usize> {
            Ok(0)
        }

        async fn query(&self, _text: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
            if self.fail {
                anyhow::bail!("index unavailable");
            }
            Ok(self.hits.iter().take(k).cloned().collect())
        }

        async fn count(&self) -> usize {
            self.hits.len()
        }
    }

    fn hit(text: &str, distance: f32, source: &str, page: usize) -> RetrievedChunk {
        RetrievedChunk {
            text: text.to_string(),
            distance,
            meta: ChunkMeta {
                source: source.to_string(),
                page,
                chunk_index: 0,
            },
        }
    }

    fn opts() -> RetrievalConfig {
        RetrievalConfig::default()
    }

    #[tokio::test]
    async fn formats_relevant_hits_with_attribution() {
        let index = FixedIndex {
            hits: vec![hit("Exams start in June.", 0.2, "docs/calendar.pdf", 4)],
            fail: false,
        };
        let ctx = retrieve_context(&index, &opts(), "when are exams").await;
        assert_eq!(ctx, "[Source: calendar, Page 5]\nExams start in June.");
    }

    #[tokio::test]
    async fn empty_index_yields_empty_context() {
        let index = FixedIndex {
            hits: vec![],
            fail: false,
        };
        assert_eq!(retrieve_context(&index, &opts(), "anything").await, "");
    }

    #[tokio::test]
    async fn failure_yields_empty_context() {
        let index = FixedIndex {
            hits: vec![],
            fail: true,
        };
        assert_eq!(retrieve_context(&index, &opts(), "anything").await, "");
    }

    #[tokio::test]
    async fn falls_back_to_raw_hits_when_nothing_relevant() {
        let index = FixedIndex {
            hits: vec![
                hit("a", 0.9, "a.txt", 0),
                hit("b", 0.8, "b.txt", 0),
                hit("c", 0.95, "c.txt", 0),
                hit("d", 0.99, "d.txt", 0),
            ],
            fail: false,
        };
        let ctx = retrieve_context(&index, &opts(), "q").await;
        // First three raw hits survive, re-sorted by distance.
        let blocks: Vec<&str> = ctx.split(BLOCK_SEPARATOR).collect();
        assert_eq!(blocks.len(), 3);
        assert!(blocks[0].contains("b"));
        assert!(blocks[1].contains("a"));
        assert!(blocks[2].contains("c"));
    }

    #[tokio::test]
    async fn caps_context_at_limit() {
        let index = FixedIndex {
            hits: (0..6)
                .map(|i| hit(&format!("passage {}", i), 0.1 * i as f32, "s.txt", 0))
                .collect(),
            fail: false,
        };
        let ctx = retrieve_context(&index, &opts(), "q").await;
        assert_eq!(ctx.split(BLOCK_SEPARATOR).count(), 4);
    }

    #[test]
    fn display_name_strips_path_and_pdf() {
        assert_eq!(display_name("uploads/2024/handbook.pdf"), "handbook");
        assert_eq!(display_name("notes.txt"), "notes.txt");
        assert_eq!(display_name("plain"), "plain");
    }
}
