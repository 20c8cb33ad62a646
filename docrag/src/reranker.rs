//! Reranker trait for re-scoring search results.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::ScoredChunk;

/// One entry of a relevance model's answer: which candidate, and its score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RerankHit {
    /// Position of the candidate in the list sent to the provider.
    ///
    /// Signed so that a provider answering with a negative index is dropped
    /// instead of failing the whole response.
    pub index: i64,
    /// Relevance score assigned by the provider.
    pub relevance_score: f32,
}

/// A reranker that re-scores and reorders search results.
///
/// Reranking is best-effort: implementations never fail, and when they
/// cannot reach their model they return the first `top_k` candidates
/// unchanged.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Rerank candidates for `query`, returning at most `top_k` of them.
    async fn rerank(&self, query: &str, candidates: Vec<ScoredChunk>, top_k: usize)
    -> Vec<ScoredChunk>;
}

/// A no-op reranker that returns the first `top_k` candidates unchanged.
///
/// Useful as a default when no reranking is needed.
///
/// # Example
///
/// ```rust,ignore
/// use docrag::NoOpReranker;
///
/// let reranked = NoOpReranker.rerank("query", results, 3).await;
/// // same order, same scores, at most 3 entries
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpReranker;

#[async_trait]
impl Reranker for NoOpReranker {
    async fn rerank(
        &self,
        _query: &str,
        mut candidates: Vec<ScoredChunk>,
        top_k: usize,
    ) -> Vec<ScoredChunk> {
        candidates.truncate(top_k);
        candidates
    }
}

#[cfg(feature = "openai")]
pub use http::HttpReranker;

#[cfg(feature = "openai")]
mod http {
    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};
    use tracing::{debug, info};

    use super::{RerankHit, Reranker};
    use crate::config::ProviderConfig;
    use crate::document::ScoredChunk;
    use crate::error::{ProviderError, ProviderResult, Result};
    use crate::fallback::rerank_or_passthrough;
    use crate::openai::{http_client, post_json};

    /// A [`Reranker`] backed by a cross-encoder `/rerank` endpoint.
    ///
    /// Sends the query and every candidate text; on success the provider's
    /// order and relevance scores replace the originals.
    #[derive(Debug, Clone)]
    pub struct HttpReranker {
        client: reqwest::Client,
        config: ProviderConfig,
    }

    #[derive(Serialize)]
    struct RerankRequest<'a> {
        model: &'a str,
        query: &'a str,
        documents: Vec<&'a str>,
        top_n: usize,
        return_documents: bool,
    }

    #[derive(Deserialize)]
    struct RerankResponse {
        results: Option<Vec<RerankHit>>,
    }

    impl HttpReranker {
        /// Create a reranker from explicit configuration.
        pub fn new(config: ProviderConfig) -> Result<Self> {
            Ok(Self { client: http_client(&config)?, config })
        }

        /// Ask the provider to score `documents` against `query`.
        pub async fn score(
            &self,
            query: &str,
            documents: &[&str],
            top_n: usize,
        ) -> ProviderResult<Vec<RerankHit>> {
            debug!(
                provider = "rerank",
                model = %self.config.rerank_model,
                documents = documents.len(),
                top_n,
                "rerank request"
            );
            let body = RerankRequest {
                model: &self.config.rerank_model,
                query,
                documents: documents.to_vec(),
                top_n,
                return_documents: false,
            };
            let response: RerankResponse =
                post_json(&self.client, &self.config, "rerank", "rerank", &body).await?;
            response
                .results
                .ok_or_else(|| ProviderError::Malformed("response has no `results` field".into()))
        }
    }

    #[async_trait]
    impl Reranker for HttpReranker {
        async fn rerank(
            &self,
            query: &str,
            candidates: Vec<ScoredChunk>,
            top_k: usize,
        ) -> Vec<ScoredChunk> {
            if candidates.is_empty() || top_k == 0 {
                return Vec::new();
            }
            let result = {
                let documents: Vec<&str> = candidates.iter().map(|c| c.text.as_str()).collect();
                self.score(query, &documents, top_k).await
            };
            let reranked = rerank_or_passthrough(candidates, result, top_k);
            info!(result_count = reranked.len(), "rerank completed");
            reranked
        }
    }
}
