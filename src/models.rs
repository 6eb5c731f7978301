//! Core data models used throughout uniassist.
//!
//! These types represent the chunks, retrieval results, and chat messages
//! that flow through the ingestion and answering pipeline.

use serde::{Deserialize, Serialize};

/// Positional metadata stored with every indexed chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkMeta {
    /// Source key of the document this chunk came from (unique per document).
    pub source: String,
    /// Zero-based page number within the source document.
    pub page: usize,
    /// Ordinal of the chunk within the whole document.
    pub chunk_index: usize,
}

/// A single nearest-neighbor hit returned by the vector index.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    /// The stored chunk text.
    pub text: String,
    /// Cosine distance to the query (lower = more relevant).
    pub distance: f32,
    /// Positional metadata of the chunk.
    pub meta: ChunkMeta,
}

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn in a conversation, in the shape the chat API expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}
