//! OpenAI-compatible HTTP providers: embeddings and chat completions.
//!
//! This module is only available when the `openai` feature is enabled.
//! Both providers speak the OpenAI wire format, so any compatible endpoint
//! (SiliconFlow, a local gateway, OpenAI itself) can be used by changing
//! [`ProviderConfig::base_url`].

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::ProviderConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{ProviderError, ProviderResult, RagError, Result};
use crate::summary::ChatCompletion;

/// Build a `reqwest` client carrying the configured timeout.
pub(crate) fn http_client(config: &ProviderConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder().timeout(config.timeout).build().map_err(|e| {
        RagError::ProviderUnavailable {
            provider: "http".into(),
            source: ProviderError::Transport(format!("failed to build HTTP client: {e}")),
        }
    })
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// POST a JSON body with bearer auth and decode the JSON reply.
pub(crate) async fn post_json<B, R>(
    client: &reqwest::Client,
    config: &ProviderConfig,
    provider: &'static str,
    path: &str,
    body: &B,
) -> ProviderResult<R>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let api_key = config.api_key.as_deref().ok_or(ProviderError::MissingCredentials)?;
    let url = config.endpoint(path);

    let response =
        client.post(&url).bearer_auth(api_key).json(body).send().await.map_err(|e| {
            error!(provider, error = %e, "request failed");
            if e.is_timeout() {
                ProviderError::Timeout(config.timeout)
            } else {
                ProviderError::Transport(e.to_string())
            }
        })?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let detail =
            serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);

        error!(provider, %status, "API error");
        return Err(ProviderError::Http { status: status.as_u16(), message: detail });
    }

    let bytes = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            ProviderError::Timeout(config.timeout)
        } else {
            ProviderError::Transport(e.to_string())
        }
    })?;
    serde_json::from_slice(&bytes).map_err(|e| {
        error!(provider, error = %e, "failed to parse response");
        ProviderError::Malformed(e.to_string())
    })
}

// ── Embeddings ─────────────────────────────────────────────────────

/// An [`EmbeddingProvider`] backed by an OpenAI-compatible `/embeddings` endpoint.
///
/// # Example
///
/// ```rust,ignore
/// use docrag::{OpenAIEmbeddingProvider, ProviderConfig};
///
/// let provider = OpenAIEmbeddingProvider::new(ProviderConfig::from_env())?;
/// let embeddings = provider.embed_batch(&["hello world"]).await?;
/// ```
#[derive(Debug, Clone)]
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl OpenAIEmbeddingProvider {
    /// Create a provider from explicit configuration.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        Ok(Self { client: http_client(&config)?, config })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Option<Vec<EmbeddingData>>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed_batch(&self, texts: &[&str]) -> ProviderResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = "OpenAI",
            batch_size = texts.len(),
            model = %self.config.embedding_model,
            "embedding batch"
        );

        let request_body =
            EmbeddingRequest { model: &self.config.embedding_model, input: texts.to_vec() };
        let response: EmbeddingResponse =
            post_json(&self.client, &self.config, "embeddings", "embeddings", &request_body)
                .await?;

        let data = response
            .data
            .ok_or_else(|| ProviderError::Malformed("response has no `data` field".into()))?;
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.config.embedding_dimensions
    }

    fn model(&self) -> &str {
        &self.config.embedding_model
    }
}

// ── Chat completions ───────────────────────────────────────────────

/// A [`ChatCompletion`] backed by an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAIChatCompletion {
    client: reqwest::Client,
    config: ProviderConfig,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAIChatCompletion {
    /// Create a chat collaborator from explicit configuration.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        Ok(Self { client: http_client(&config)?, config, temperature: 0.3, max_tokens: 300 })
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the completion token limit.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl ChatCompletion for OpenAIChatCompletion {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> ProviderResult<String> {
        let mut messages = Vec::with_capacity(2);
        if !system_prompt.is_empty() {
            messages.push(ChatMessage { role: "system", content: system_prompt });
        }
        messages.push(ChatMessage { role: "user", content: user_prompt });

        debug!(provider = "OpenAI", model = %self.config.chat_model, "chat completion");

        let request_body = ChatRequest {
            model: &self.config.chat_model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let response: ChatResponse =
            post_json(&self.client, &self.config, "chat", "chat/completions", &request_body)
                .await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::Malformed("response has no choices".into()))
    }
}
