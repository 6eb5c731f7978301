//! Chat model contract and the OpenAI-compatible client.
//!
//! The rest of the crate calls the language model through [`ChatModel`],
//! an opaque completion capability with a blocking and a streaming
//! variant. [`OpenAiChat`] implements it against any OpenAI-compatible
//! `POST /chat/completions` endpoint (Groq by default); the streaming
//! variant parses the server-sent `data:` lines incrementally and yields
//! each `delta.content` fragment as it arrives.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::models::ChatMessage;

/// Sampling parameters for one completion call.
#[derive(Debug, Clone, Copy)]
pub struct CompletionParams {
    pub temperature: f32,
    pub top_p: Option<f32>,
    pub max_tokens: u32,
}

impl CompletionParams {
    /// Parameters for conversational answering, from config.
    pub fn chat(config: &LlmConfig) -> Self {
        Self {
            temperature: config.temperature,
            top_p: Some(config.top_p),
            max_tokens: config.max_tokens,
        }
    }
}

/// An opaque chat-completion capability.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run one completion and return the full response text.
    async fn complete(&self, messages: &[ChatMessage], params: CompletionParams)
        -> Result<String>;

    /// Run one completion, yielding response text fragments as they are
    /// produced. The stream is finite and non-restartable; a mid-stream
    /// fault surfaces as an `Err` item and ends the stream.
    async fn stream_complete(
        &self,
        messages: &[ChatMessage],
        params: CompletionParams,
    ) -> Result<BoxStream<'static, Result<String>>>;
}

/// Client for an OpenAI-compatible chat completions API.
pub struct OpenAiChat {
    config: LlmConfig,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiChat {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `GROQ_API_KEY` is not in the environment or
    /// the HTTP client cannot be built.
    pub fn new(config: LlmConfig) -> Result<Self> {
        let api_key = std::env::var("GROQ_API_KEY")
            .map_err(|_| anyhow::anyhow!("GROQ_API_KEY environment variable not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    fn request_body(
        &self,
        messages: &[ChatMessage],
        params: CompletionParams,
        stream: bool,
    ) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": params.temperature,
            "max_tokens": params.max_tokens,
            "stream": stream,
        });
        if let Some(top_p) = params.top_p {
            body["top_p"] = serde_json::json!(top_p);
        }
        body
    }

    async fn send(
        &self,
        messages: &[ChatMessage],
        params: CompletionParams,
        stream: bool,
    ) -> Result<reqwest::Response> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.request_body(messages, params, stream))
            .send()
            .await
            .context("chat completions request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("chat completions API error {}: {}", status, body);
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: CompletionParams,
    ) -> Result<String> {
        let response = self.send(messages, params, false).await?;
        let json: serde_json::Value = response.json().await?;

        json.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("Invalid chat completions response: missing content"))
    }

    async fn stream_complete(
        &self,
        messages: &[ChatMessage],
        params: CompletionParams,
    ) -> Result<BoxStream<'static, Result<String>>> {
        let response = self.send(messages, params, true).await?;
        let mut bytes = response.bytes_stream();

        let stream = async_stream::stream! {
            let mut buffer = String::new();

            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(anyhow::anyhow!("stream transport error: {}", e));
                        return;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&chunk));

                // SSE events are newline-delimited; keep any trailing
                // partial line in the buffer for the next chunk.
                while let Some(pos) = buffer.find('\n') {
                    let line = buffer[..pos].trim().to_string();
                    buffer.drain(..=pos);

                    if let Some(fragment) = parse_sse_line(&line) {
                        match fragment {
                            SseItem::Fragment(text) => yield Ok(text),
                            SseItem::Done => return,
                        }
                    }
                }
            }
        };

        Ok(stream.boxed())
    }
}

enum SseItem {
    Fragment(String),
    Done,
}

/// Parse one SSE line from a chat completions stream.
///
/// Returns `None` for blank lines, comments, and deltas with no content
/// (role-only or finish-reason events).
fn parse_sse_line(line: &str) -> Option<SseItem> {
    let data = line.strip_prefix("data:")?.trim();

    if data == "[DONE]" {
        return Some(SseItem::Done);
    }

    let json: serde_json::Value = serde_json::from_str(data).ok()?;
    let content = json
        .get("choices")?
        .get(0)?
        .get("delta")?
        .get("content")?
        .as_str()?;

    if content.is_empty() {
        return None;
    }

    Some(SseItem::Fragment(content.to_string()))
}
