//! # UniAssist
//!
//! Retrieval-augmented answering core for institutional document Q&A.
//!
//! UniAssist ingests administrative documents (PDF or plain text), chunks
//! and embeds them into an in-memory vector index, and answers student
//! questions by retrieving relevant passages, assembling a bounded
//! conversation prompt, and calling a chat model, in one shot or as an
//! incrementally streamed event sequence. Per-client request budgets and
//! administrative email drafting round out the surface.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────────┐   ┌─────────────┐
//! │  Upload  │──▶│ Extract → Clean   │──▶│ VectorIndex │
//! │ PDF/text │   │ → Chunk → Embed   │   │ (in-memory) │
//! └──────────┘   └───────────────────┘   └──────┬──────┘
//!                                               │
//! ┌──────────┐   ┌──────────┐   ┌────────┐      │
//! │ Question │──▶│ Throttle │──▶│Retrieve│◀─────┘
//! └──────────┘   └──────────┘   └───┬────┘
//!                                   ▼
//!                    ┌────────┐  ┌──────┐  ┌──────────┐
//!                    │ Prompt │─▶│ Chat │─▶│  Stream  │
//!                    │ 8-turn │  │ model│  │ dispatch │
//!                    └────────┘  └──────┘  └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`extract`] | Page-level PDF and plain-text extraction |
//! | [`normalize`] | Page cleaning and client input sanitation |
//! | [`chunk`] | Separator-priority chunking with overlap |
//! | [`embedding`] | Embedding provider abstraction and vector math |
//! | [`index`] | Vector index contract and in-memory store |
//! | [`ingest`] | Document ingestion pipeline |
//! | [`retrieve`] | Context retrieval and formatting |
//! | [`prompt`] | Conversation assembly |
//! | [`llm`] | Chat model contract and OpenAI-compatible client |
//! | [`email`] | Administrative email drafting |
//! | [`throttle`] | Sliding-window request budgets |
//! | [`stream`] | Streamed answer event framing |
//! | [`assistant`] | High-level facade |

pub mod assistant;
pub mod chunk;
pub mod config;
pub mod email;
pub mod embedding;
pub mod extract;
pub mod index;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod normalize;
pub mod prompt;
pub mod retrieve;
pub mod stream;
pub mod throttle;
