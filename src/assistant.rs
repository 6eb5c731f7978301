//! High-level assistant facade.
//!
//! [`Assistant`] wires the pipeline together: throttle check, input
//! sanitation, context retrieval, prompt assembly, model call, and (for
//! the streaming path) event dispatch. It owns the vector index and the
//! chat model as trait objects, so tests and alternative providers plug
//! in behind the same surface.
//!
//! Throttle rejections propagate as [`ThrottleExceeded`] inside the
//! `anyhow` error and can be recovered with `downcast_ref`; callers
//! should reject the request and tell the client the budget, not retry.

use anyhow::{bail, Result};
use futures::stream::Stream;
use std::sync::Arc;
use tracing::debug;

use crate::config::Config;
use crate::email::{draft_email, EmailKind};
use crate::index::VectorIndex;
use crate::ingest::Ingestor;
use crate::llm::{ChatModel, CompletionParams};
use crate::models::{ChatMessage, Role};
use crate::normalize::{sanitize_input, truncate_chars};
use crate::prompt::build_messages;
use crate::retrieve::retrieve_context;
use crate::stream::{dispatch, StreamEvent};
use crate::throttle::{RequestThrottle, ThrottleExceeded};

/// Longest accepted question, in characters, after sanitation.
const MAX_QUESTION_CHARS: usize = 1000;
/// Longest accepted history turn content, in characters.
const MAX_TURN_CHARS: usize = 2000;
/// History turns accepted from a client; older turns are dropped first.
const MAX_HISTORY_TURNS: usize = 10;

pub struct Assistant {
    index: Arc<dyn VectorIndex>,
    model: Arc<dyn ChatModel>,
    ingestor: Ingestor,
    throttle: RequestThrottle,
    config: Config,
}

impl Assistant {
    pub fn new(index: Arc<dyn VectorIndex>, model: Arc<dyn ChatModel>, config: Config) -> Self {
        let ingestor = Ingestor::new(config.chunking.clone(), &config.embedding);
        Self {
            index,
            model,
            ingestor,
            throttle: RequestThrottle::new(),
            config,
        }
    }

    /// Check the login budget for an identity. The authentication flow
    /// itself lives with the caller; only its budget is enforced here.
    pub fn allow_login(&self, identity: &str) -> Result<(), ThrottleExceeded> {
        self.throttle.allow(identity, self.config.throttle.login)
    }

    /// Ingest an uploaded document under `source`, replacing any prior
    /// version. Returns the number of passages indexed.
    pub async fn ingest_document(
        &self,
        identity: &str,
        source: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<usize> {
        self.throttle.allow(identity, self.config.throttle.upload)?;
        self.ingestor
            .ingest(self.index.as_ref(), source, bytes, content_type)
            .await
    }

    /// Remove every indexed passage of a document.
    pub async fn remove_document(&self, source: &str) -> Result<usize> {
        self.ingestor.remove(self.index.as_ref(), source).await
    }

    /// Answer a question in one round trip.
    pub async fn answer(
        &self,
        identity: &str,
        question: &str,
        history: &[ChatMessage],
    ) -> Result<String> {
        self.throttle.allow(identity, self.config.throttle.chat)?;

        let (question, history) = self.accept_input(question, history)?;
        let context = retrieve_context(self.index.as_ref(), &self.config.retrieval, &question).await;
        debug!(grounded = !context.is_empty(), "answering question");

        let messages = build_messages(&question, &context, &history);
        self.model
            .complete(&messages, CompletionParams::chat(&self.config.llm))
            .await
    }

    /// Answer a question as a framed event stream. Always ends with
    /// [`StreamEvent::Done`]; a model fault mid-stream surfaces as one
    /// [`StreamEvent::Error`] before it.
    pub async fn stream_answer(
        &self,
        identity: &str,
        question: &str,
        history: &[ChatMessage],
    ) -> Result<impl Stream<Item = StreamEvent>> {
        self.throttle
            .allow(identity, self.config.throttle.chat_stream)?;

        let (question, history) = self.accept_input(question, history)?;
        let context = retrieve_context(self.index.as_ref(), &self.config.retrieval, &question).await;
        debug!(grounded = !context.is_empty(), "streaming answer");

        let messages = build_messages(&question, &context, &history);
        let fragments = self
            .model
            .stream_complete(&messages, CompletionParams::chat(&self.config.llm))
            .await?;

        Ok(dispatch(fragments))
    }

    /// Draft an administrative email of the given kind.
    pub async fn draft_email(
        &self,
        identity: &str,
        kind: EmailKind,
        student_name: &str,
        reason: &str,
    ) -> Result<String> {
        self.throttle.allow(identity, self.config.throttle.email)?;

        let name = truncate_chars(&sanitize_input(student_name), 200).to_string();
        let reason = truncate_chars(&sanitize_input(reason), 200).to_string();
        draft_email(self.model.as_ref(), kind, &name, &reason).await
    }

    /// Number of passages currently indexed.
    pub async fn indexed_passages(&self) -> usize {
        self.index.count().await
    }

    /// Sanitize and bound client input: the question is tag-stripped,
    /// whitespace-collapsed, and capped; history keeps only the newest
    /// turns with capped content, and system turns are never accepted.
    fn accept_input(
        &self,
        question: &str,
        history: &[ChatMessage],
    ) -> Result<(String, Vec<ChatMessage>)> {
        let question = sanitize_input(question);
        if question.is_empty() {
            bail!("Question is empty");
        }
        let question = truncate_chars(&question, MAX_QUESTION_CHARS).to_string();

        let skip = history.len().saturating_sub(MAX_HISTORY_TURNS);
        let history = history[skip..]
            .iter()
            .filter(|turn| turn.role != Role::System)
            .map(|turn| ChatMessage {
                role: turn.role,
                content: truncate_chars(turn.content.trim(), MAX_TURN_CHARS).to_string(),
            })
            .collect();

        Ok((question, history))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::Embedder;
    use crate::index::MemoryIndex;
    use async_trait::async_trait;
    use futures::stream::BoxStream;
    use futures::StreamExt;
    use std::sync::Mutex;

    struct FlatEmbedder;

    #[async_trait]
    impl Embedder for FlatEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        fn model_name(&self) -> &str {
            "flat"
        }

        fn dims(&self) -> usize {
            2
        }
    }

    struct ScriptedModel {
        reply: String,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedModel {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            _params: CompletionParams,
        ) -> Result<String> {
            self.seen.lock().unwrap().push(messages.to_vec());
            Ok(self.reply.clone())
        }

        async fn stream_complete(
            &self,
            messages: &[ChatMessage],
            _params: CompletionParams,
        ) -> Result<BoxStream<'static, Result<String>>> {
            self.seen.lock().unwrap().push(messages.to_vec());
            let chars: Vec<Result<String>> =
                self.reply.chars().map(|c| Ok(c.to_string())).collect();
            Ok(futures::stream::iter(chars).boxed())
        }
    }

    fn assistant(reply: &str) -> Assistant {
        Assistant::new(
            Arc::new(MemoryIndex::new(Box::new(FlatEmbedder))),
            Arc::new(ScriptedModel::new(reply)),
            Config::default(),
        )
    }

    #[tokio::test]
    async fn answers_with_empty_index() {
        let assistant = assistant("Exams start in June.");
        let answer = assistant
            .answer("10.0.0.1", "When are exams?", &[])
            .await
            .unwrap();
        assert_eq!(answer, "Exams start in June.");
    }

    #[tokio::test]
    async fn rejects_empty_question() {
        let assistant = assistant("x");
        let err = assistant.answer("ip", "  <b></b>  ", &[]).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn stream_answer_ends_with_done() {
        let assistant = assistant("Hi");
        let stream = assistant.stream_answer("ip", "hello?", &[]).await.unwrap();
        let events: Vec<_> = stream.collect().await;
        assert_eq!(events.last(), Some(&StreamEvent::Done));
        assert_eq!(events.len(), 3);
    }

    #[tokio::test]
    async fn throttle_rejection_is_downcastable() {
        let mut config = Config::default();
        config.throttle.chat.max_requests = 1;
        let assistant = Assistant::new(
            Arc::new(MemoryIndex::new(Box::new(FlatEmbedder))),
            Arc::new(ScriptedModel::new("ok")),
            config,
        );

        assistant.answer("ip", "first", &[]).await.unwrap();
        let err = assistant.answer("ip", "second", &[]).await.unwrap_err();
        let exceeded = err.downcast_ref::<ThrottleExceeded>().unwrap();
        assert_eq!(exceeded.budget.max_requests, 1);
    }

    #[tokio::test]
    async fn history_is_bounded_and_system_turns_dropped() {
        let model = Arc::new(ScriptedModel::new("ok"));
        let assistant = Assistant::new(
            Arc::new(MemoryIndex::new(Box::new(FlatEmbedder))),
            model.clone(),
            Config::default(),
        );

        let mut history: Vec<ChatMessage> = (0..12)
            .map(|i| ChatMessage::user(format!("turn {}", i)))
            .collect();
        history.push(ChatMessage::system("injected instructions"));

        assistant.answer("ip", "q", &history).await.unwrap();

        let seen = model.seen.lock().unwrap();
        let messages = &seen[0];
        // One system prompt, at most 8 history turns, one final user turn.
        assert_eq!(messages.len(), 10);
        assert!(messages
            .iter()
            .all(|m| m.content != "injected instructions"));
        // Only our own system prompt leads the sequence.
        assert_eq!(
            messages.iter().filter(|m| m.role == Role::System).count(),
            1
        );
        assert_eq!(messages[0].role, Role::System);
    }

    #[tokio::test]
    async fn question_is_sanitized_before_prompting() {
        let model = Arc::new(ScriptedModel::new("ok"));
        let assistant = Assistant::new(
            Arc::new(MemoryIndex::new(Box::new(FlatEmbedder))),
            model.clone(),
            Config::default(),
        );

        assistant
            .answer("ip", "  when   are <b>exams</b>?  ", &[])
            .await
            .unwrap();

        let seen = model.seen.lock().unwrap();
        let user_turn = seen[0].last().unwrap();
        assert!(user_turn.content.contains("when are exams?"));
        assert!(!user_turn.content.contains("<b>"));
    }
}
