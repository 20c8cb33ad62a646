//! Configuration for chunking, retrieval, and external providers.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Default base URL for the OpenAI-compatible provider endpoints.
pub const DEFAULT_BASE_URL: &str = "https://api.siliconflow.cn/v1";

/// Default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "BAAI/bge-large-zh-v1.5";

/// Nominal dimensionality of [`DEFAULT_EMBEDDING_MODEL`].
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1024;

/// Default rerank model.
pub const DEFAULT_RERANK_MODEL: &str = "BAAI/bge-reranker-v2-m3";

/// Default chat model used for document summaries.
pub const DEFAULT_CHAT_MODEL: &str = "deepseek-ai/DeepSeek-V3";

/// Parameters for chunking and retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of trailing characters of a chunk repeated at the start of the next.
    pub chunk_overlap: usize,
    /// Number of top results to return from search.
    pub top_k: usize,
    /// Minimum score for results returned by [`DocRag::search`](crate::DocRag::search).
    pub similarity_threshold: f32,
    /// Maximum number of texts per embedding request.
    pub batch_size: usize,
    /// Maximum number of embedding requests in flight at once.
    #[serde(default = "default_max_concurrent_batches")]
    pub max_concurrent_batches: usize,
}

fn default_max_concurrent_batches() -> usize {
    4
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 100,
            top_k: 3,
            similarity_threshold: f32::NEG_INFINITY,
            batch_size: 20,
            max_concurrent_batches: default_max_concurrent_batches(),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Check that a chunk size / overlap pair is usable.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfig`] if `chunk_size == 0` or
    /// `chunk_overlap >= chunk_size`.
    pub fn validate_chunking(chunk_size: usize, chunk_overlap: usize) -> Result<()> {
        if chunk_size == 0 {
            return Err(RagError::InvalidConfig("chunk_size must be greater than zero".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::InvalidConfig(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of top results to return from search.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the minimum similarity threshold for filtering results.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = threshold;
        self
    }

    /// Set the maximum number of texts sent per embedding request.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    /// Set how many embedding requests may run at once.
    pub fn max_concurrent_batches(mut self, limit: usize) -> Self {
        self.config.max_concurrent_batches = limit;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfig`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `batch_size == 0`
    /// - `max_concurrent_batches == 0`
    pub fn build(self) -> Result<RagConfig> {
        RagConfig::validate_chunking(self.config.chunk_size, self.config.chunk_overlap)?;
        if self.config.top_k == 0 {
            return Err(RagError::InvalidConfig("top_k must be greater than zero".to_string()));
        }
        if self.config.batch_size == 0 {
            return Err(RagError::InvalidConfig("batch_size must be greater than zero".to_string()));
        }
        if self.config.max_concurrent_batches == 0 {
            return Err(RagError::InvalidConfig(
                "max_concurrent_batches must be greater than zero".to_string(),
            ));
        }
        Ok(self.config)
    }
}

/// Connection settings shared by the HTTP providers.
///
/// Passed explicitly to every provider at construction time. A missing
/// `api_key` is not an error here: each provider reports
/// [`ProviderError::MissingCredentials`](crate::ProviderError::MissingCredentials)
/// at call time and the caller falls back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
    /// Bearer token for the provider API.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL; endpoint paths (`/embeddings`, `/rerank`, `/chat/completions`) are appended.
    pub base_url: String,
    /// Embedding model name.
    pub embedding_model: String,
    /// Nominal dimensionality of the embedding model.
    pub embedding_dimensions: usize,
    /// Rerank model name.
    pub rerank_model: String,
    /// Chat model used for summaries.
    pub chat_model: String,
    /// Timeout applied to every request.
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            rerank_model: DEFAULT_RERANK_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl ProviderConfig {
    /// Create a config with the given API key and default endpoints.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { api_key: Some(api_key.into()), ..Self::default() }
    }

    /// Read settings from the environment.
    ///
    /// `OPENAI_API_KEY` (or `DOCRAG_API_KEY`) supplies the key; `DOCRAG_BASE_URL`,
    /// `DOCRAG_EMBEDDING_MODEL`, `DOCRAG_EMBEDDING_DIMENSIONS`, `DOCRAG_RERANK_MODEL`,
    /// `DOCRAG_CHAT_MODEL` and `DOCRAG_TIMEOUT_SECS` override the defaults.
    /// Unparseable numbers keep the default.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.api_key = std::env::var("DOCRAG_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .ok()
            .filter(|key| !key.trim().is_empty());
        if let Ok(url) = std::env::var("DOCRAG_BASE_URL") {
            config.base_url = url;
        }
        if let Ok(model) = std::env::var("DOCRAG_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        if let Some(dims) =
            std::env::var("DOCRAG_EMBEDDING_DIMENSIONS").ok().and_then(|v| v.parse().ok())
        {
            config.embedding_dimensions = dims;
        }
        if let Ok(model) = std::env::var("DOCRAG_RERANK_MODEL") {
            config.rerank_model = model;
        }
        if let Ok(model) = std::env::var("DOCRAG_CHAT_MODEL") {
            config.chat_model = model;
        }
        if let Some(secs) = std::env::var("DOCRAG_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok())
        {
            config.timeout = Duration::from_secs(secs);
        }
        config
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the embedding model and its nominal dimensionality.
    pub fn with_embedding_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.embedding_model = model.into();
        self.embedding_dimensions = dimensions;
        self
    }

    /// Set the rerank model.
    pub fn with_rerank_model(mut self, model: impl Into<String>) -> Self {
        self.rerank_model = model.into();
        self
    }

    /// Set the chat model.
    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Join the base URL and an endpoint path.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_rejects_zero_chunk_size() {
        let err = RagConfig::builder().chunk_size(0).chunk_overlap(0).build().unwrap_err();
        assert!(matches!(err, RagError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_overlap_not_smaller_than_size() {
        let err = RagConfig::builder().chunk_size(100).chunk_overlap(100).build().unwrap_err();
        assert!(matches!(err, RagError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_zero_top_k_and_batch() {
        assert!(RagConfig::builder().top_k(0).build().is_err());
        assert!(RagConfig::builder().batch_size(0).build().is_err());
        assert!(RagConfig::builder().max_concurrent_batches(0).build().is_err());
    }

    #[test]
    fn defaults_build() {
        let config = RagConfig::builder().build().unwrap();
        assert_eq!(config, RagConfig::default());
        assert_eq!(config.batch_size, 20);
        assert_eq!(config.max_concurrent_batches, 4);
    }

    #[test]
    fn older_configs_get_the_default_concurrency() {
        let json = r#"{"chunk_size":500,"chunk_overlap":100,"top_k":3,"similarity_threshold":0.0,"batch_size":20}"#;
        let config: RagConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.max_concurrent_batches, 4);
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let config = ProviderConfig::default().with_base_url("http://localhost:9000/v1/");
        assert_eq!(config.endpoint("/embeddings"), "http://localhost:9000/v1/embeddings");
    }

    #[test]
    fn provider_config_round_trips_through_json() {
        let config = ProviderConfig::new("sk-test").with_timeout(Duration::from_secs(5));
        let json = serde_json::to_string(&config).unwrap();
        let back: ProviderConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
