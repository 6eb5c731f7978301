use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub throttle: ThrottleConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: default_embedding_base_url(),
            model: default_embedding_model(),
            dims: default_dims(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_embedding_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_dims() -> usize {
    1536
}
fn default_batch_size() -> usize {
    50
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

fn default_llm_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}
fn default_llm_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}
fn default_temperature() -> f32 {
    0.25
}
fn default_top_p() -> f32 {
    0.9
}
fn default_max_tokens() -> u32 {
    1200
}
fn default_llm_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
    #[serde(default = "default_min_chunk_chars")]
    pub min_chunk_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
            min_chunk_chars: default_min_chunk_chars(),
        }
    }
}

fn default_chunk_size() -> usize {
    400
}
fn default_overlap() -> usize {
    80
}
fn default_min_chunk_chars() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Nearest neighbors requested per query.
    #[serde(default = "default_candidate_k")]
    pub candidate_k: usize,
    /// Cosine-distance cutoff: only hits strictly below this are relevant.
    #[serde(default = "default_distance_threshold")]
    pub distance_threshold: f32,
    /// Raw hits kept when nothing beats the threshold.
    #[serde(default = "default_fallback_k")]
    pub fallback_k: usize,
    /// Chunks included in the formatted context block.
    #[serde(default = "default_context_limit")]
    pub context_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            candidate_k: default_candidate_k(),
            distance_threshold: default_distance_threshold(),
            fallback_k: default_fallback_k(),
            context_limit: default_context_limit(),
        }
    }
}

fn default_candidate_k() -> usize {
    6
}
fn default_distance_threshold() -> f32 {
    0.7
}
fn default_fallback_k() -> usize {
    3
}
fn default_context_limit() -> usize {
    4
}

/// One operation class budget: at most `max_requests` per identity per
/// trailing `window_secs`.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    pub max_requests: usize,
    pub window_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ThrottleConfig {
    #[serde(default = "default_login_budget")]
    pub login: Budget,
    #[serde(default = "default_chat_budget")]
    pub chat: Budget,
    #[serde(default = "default_chat_stream_budget")]
    pub chat_stream: Budget,
    #[serde(default = "default_upload_budget")]
    pub upload: Budget,
    #[serde(default = "default_email_budget")]
    pub email: Budget,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            login: default_login_budget(),
            chat: default_chat_budget(),
            chat_stream: default_chat_stream_budget(),
            upload: default_upload_budget(),
            email: default_email_budget(),
        }
    }
}

fn default_login_budget() -> Budget {
    Budget {
        max_requests: 5,
        window_secs: 60,
    }
}
fn default_chat_budget() -> Budget {
    Budget {
        max_requests: 30,
        window_secs: 60,
    }
}
fn default_chat_stream_budget() -> Budget {
    Budget {
        max_requests: 20,
        window_secs: 60,
    }
}
fn default_upload_budget() -> Budget {
    Budget {
        max_requests: 10,
        window_secs: 60,
    }
}
fn default_email_budget() -> Budget {
    Budget {
        max_requests: 10,
        window_secs: 60,
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.overlap >= config.chunking.chunk_size {
        anyhow::bail!("chunking.overlap must be smaller than chunking.chunk_size");
    }

    if config.embedding.dims == 0 {
        anyhow::bail!("embedding.dims must be > 0");
    }
    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }

    // Cosine distance lives in [0, 2].
    if !(0.0..=2.0).contains(&config.retrieval.distance_threshold)
        || config.retrieval.distance_threshold == 0.0
    {
        anyhow::bail!("retrieval.distance_threshold must be in (0.0, 2.0]");
    }
    if config.retrieval.context_limit == 0 {
        anyhow::bail!("retrieval.context_limit must be >= 1");
    }

    for (name, budget) in [
        ("login", &config.throttle.login),
        ("chat", &config.throttle.chat),
        ("chat_stream", &config.throttle.chat_stream),
        ("upload", &config.throttle.upload),
        ("email", &config.throttle.email),
    ] {
        if budget.max_requests == 0 || budget.window_secs == 0 {
            anyhow::bail!("throttle.{} budget must have non-zero max and window", name);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(validate(&config).is_ok());
        assert_eq!(config.chunking.chunk_size, 400);
        assert_eq!(config.chunking.overlap, 80);
        assert_eq!(config.retrieval.distance_threshold, 0.7);
        assert_eq!(config.throttle.chat.max_requests, 30);
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let config: Config = toml::from_str(
            r#"
            [llm]
            model = "llama-3.1-8b-instant"

            [throttle.chat]
            max_requests = 10
            window_secs = 30
            "#,
        )
        .unwrap();
        assert_eq!(config.llm.model, "llama-3.1-8b-instant");
        assert_eq!(config.llm.temperature, 0.25);
        assert_eq!(config.throttle.chat.max_requests, 10);
        assert_eq!(config.throttle.upload.max_requests, 10);
    }

    #[test]
    fn rejects_overlap_not_smaller_than_chunk_size() {
        let mut config = Config::default();
        config.chunking.overlap = config.chunking.chunk_size;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_zero_distance_threshold() {
        let mut config = Config::default();
        config.retrieval.distance_threshold = 0.0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_zero_budget() {
        let mut config = Config::default();
        config.throttle.login.max_requests = 0;
        assert!(validate(&config).is_err());
    }
}
