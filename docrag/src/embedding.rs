//! Embedding provider trait and the batching adapter built on top of it.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::{debug, info};

use crate::config::DEFAULT_EMBEDDING_DIMENSIONS;
use crate::error::{ProviderError, ProviderResult};
use crate::fallback::{embeddings_or_placeholder, placeholder_vectors, query_vector_or_none};

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap a specific embedding backend behind a unified async
/// interface. The default [`embed`](EmbeddingProvider::embed) implementation
/// sends a one-element batch.
///
/// # Example
///
/// ```rust,ignore
/// use docrag::EmbeddingProvider;
///
/// let provider = MyEmbeddingProvider::new();
/// let embeddings = provider.embed_batch(&["hello", "world"]).await?;
/// assert_eq!(embeddings[0].len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding vectors for a batch of inputs, in input order.
    async fn embed_batch(&self, texts: &[&str]) -> ProviderResult<Vec<Vec<f32>>>;

    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> ProviderResult<Vec<f32>> {
        self.embed_batch(&[text]).await?.into_iter().next().ok_or_else(|| {
            ProviderError::Malformed("provider returned no embedding".to_string())
        })
    }

    /// Nominal dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// Model name recorded alongside stored vectors.
    fn model(&self) -> &str;
}

/// Batches texts through an [`EmbeddingProvider`] and never fails.
///
/// Texts are sent in batches of at most `batch_size`. At most
/// `max_concurrent_batches` requests are in flight at once, and results are
/// reassembled in input order. A batch that fails, or
/// returns the wrong number or size of vectors, is replaced by zero vectors
/// of the nominal dimensionality. Without a provider every text gets a
/// placeholder.
#[derive(Clone)]
pub struct Embedder {
    provider: Option<Arc<dyn EmbeddingProvider>>,
    batch_size: usize,
    max_concurrent_batches: usize,
    dimensions: usize,
}

impl std::fmt::Debug for Embedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Embedder")
            .field("provider", &self.provider.as_ref().map(|p| p.model().to_string()))
            .field("batch_size", &self.batch_size)
            .field("max_concurrent_batches", &self.max_concurrent_batches)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

impl Embedder {
    /// Default maximum number of texts per provider call.
    pub const DEFAULT_BATCH_SIZE: usize = 20;

    /// Default number of provider calls allowed in flight.
    pub const DEFAULT_MAX_CONCURRENT_BATCHES: usize = 4;

    /// Wrap a provider. Placeholders use the provider's nominal dimensionality.
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        let dimensions = provider.dimensions();
        Self {
            provider: Some(provider),
            batch_size: Self::DEFAULT_BATCH_SIZE,
            max_concurrent_batches: Self::DEFAULT_MAX_CONCURRENT_BATCHES,
            dimensions,
        }
    }

    /// An adapter with no provider; every embedding is a placeholder.
    pub fn placeholder(dimensions: usize) -> Self {
        Self {
            provider: None,
            batch_size: Self::DEFAULT_BATCH_SIZE,
            max_concurrent_batches: Self::DEFAULT_MAX_CONCURRENT_BATCHES,
            dimensions,
        }
    }

    /// Set the batch size (values below 1 are treated as 1).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Cap the number of provider calls in flight (values below 1 are treated as 1).
    pub fn with_max_concurrent_batches(mut self, limit: usize) -> Self {
        self.max_concurrent_batches = limit.max(1);
        self
    }

    /// Nominal dimensionality of every vector this adapter returns.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Maximum number of provider calls in flight.
    pub fn max_concurrent_batches(&self) -> usize {
        self.max_concurrent_batches
    }

    /// Model name of the wrapped provider, if any.
    pub fn model(&self) -> Option<&str> {
        self.provider.as_deref().map(|p| p.model())
    }

    /// Embed every text; output length and order always match the input.
    pub async fn embed_batch(&self, texts: &[&str]) -> Vec<Vec<f32>> {
        if texts.is_empty() {
            return Vec::new();
        }
        let Some(provider) = &self.provider else {
            return embeddings_or_placeholder(
                Err(ProviderError::MissingCredentials),
                texts.len(),
                self.dimensions,
            );
        };

        let batches: Vec<&[&str]> = texts.chunks(self.batch_size).collect();
        info!(
            texts = texts.len(),
            batches = batches.len(),
            max_in_flight = self.max_concurrent_batches,
            model = provider.model(),
            "embedding texts"
        );

        // buffered keeps outputs in input order
        // futures are built eagerly (still lazy until polled) so the stream
        // holds no closure; this keeps the future provably `Send`
        let batch_futures: Vec<_> = batches
            .into_iter()
            .enumerate()
            .map(|(i, batch)| async move {
                debug!(batch = i, batch_size = batch.len(), "sending embedding batch");
                let result = provider.embed_batch(batch).await;
                embeddings_or_placeholder(result, batch.len(), self.dimensions)
            })
            .collect();
        let results: Vec<Vec<Vec<f32>>> = stream::iter(batch_futures)
            .buffered(self.max_concurrent_batches)
            .collect()
            .await;

        results.into_iter().flatten().collect()
    }

    /// Embed one text, falling back to a placeholder.
    pub async fn embed_one(&self, text: &str) -> Vec<f32> {
        self.embed_batch(&[text])
            .await
            .pop()
            .unwrap_or_else(|| placeholder_vectors(1, self.dimensions).remove(0))
    }

    /// Embed a search query, or `None` when keyword search should be used.
    pub async fn embed_query(&self, query: &str) -> Option<Vec<f32>> {
        let result = match &self.provider {
            Some(provider) => provider.embed(query).await,
            None => Err(ProviderError::MissingCredentials),
        };
        query_vector_or_none(result)
    }
}

impl Default for Embedder {
    fn default() -> Self {
        Self::placeholder(DEFAULT_EMBEDDING_DIMENSIONS)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Embeds each text as `[len, first byte]` and records batch sizes.
    struct LengthProvider {
        calls: Mutex<Vec<usize>>,
        fail_batch_containing: Option<&'static str>,
    }

    impl LengthProvider {
        fn new() -> Self {
            Self { calls: Mutex::new(Vec::new()), fail_batch_containing: None }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for LengthProvider {
        async fn embed_batch(&self, texts: &[&str]) -> ProviderResult<Vec<Vec<f32>>> {
            self.calls.lock().unwrap().push(texts.len());
            if let Some(marker) = self.fail_batch_containing {
                if texts.contains(&marker) {
                    return Err(ProviderError::Http { status: 500, message: "boom".into() });
                }
            }
            Ok(texts
                .iter()
                .map(|t| vec![t.len() as f32, t.bytes().next().unwrap_or(0) as f32])
                .collect())
        }

        fn dimensions(&self) -> usize {
            2
        }

        fn model(&self) -> &str {
            "length"
        }
    }

    #[tokio::test]
    async fn batches_respect_size_and_preserve_order() {
        let provider = Arc::new(LengthProvider::new());
        let embedder = Embedder::new(provider.clone()).with_batch_size(2);
        let texts = ["a", "bb", "ccc", "dddd", "eeeee"];

        let out = embedder.embed_batch(&texts).await;

        assert_eq!(out.len(), texts.len());
        for (text, vector) in texts.iter().zip(&out) {
            assert_eq!(vector[0], text.len() as f32);
        }
        let mut calls = provider.calls.lock().unwrap().clone();
        calls.sort_unstable();
        assert_eq!(calls, vec![1, 2, 2]);
    }

    /// Counts concurrent calls and remembers the highest count seen.
    #[derive(Default)]
    struct InFlightProvider {
        current: std::sync::atomic::AtomicUsize,
        peak: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for InFlightProvider {
        async fn embed_batch(&self, texts: &[&str]) -> ProviderResult<Vec<Vec<f32>>> {
            use std::sync::atomic::Ordering::SeqCst;
            let now = self.current.fetch_add(1, SeqCst) + 1;
            self.peak.fetch_max(now, SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            self.current.fetch_sub(1, SeqCst);
            Ok(texts.iter().map(|t| vec![t.len() as f32, 0.0]).collect())
        }

        fn dimensions(&self) -> usize {
            2
        }

        fn model(&self) -> &str {
            "in-flight"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_batches_are_capped() {
        let provider = Arc::new(InFlightProvider::default());
        let embedder =
            Embedder::new(provider.clone()).with_batch_size(2).with_max_concurrent_batches(3);
        let texts: Vec<String> = (1..=40).map(|n| "x".repeat(n)).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();

        let out = embedder.embed_batch(&refs).await;

        assert_eq!(provider.peak.load(std::sync::atomic::Ordering::SeqCst), 3);
        let lengths: Vec<f32> = out.iter().map(|v| v[0]).collect();
        let expected: Vec<f32> = (1..=40).map(|n| n as f32).collect();
        assert_eq!(lengths, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn default_concurrency_is_bounded() {
        let provider = Arc::new(InFlightProvider::default());
        let embedder = Embedder::new(provider.clone());
        let texts = vec!["t"; 2000];

        assert_eq!(embedder.embed_batch(&texts).await.len(), 2000);
        assert_eq!(
            provider.peak.load(std::sync::atomic::Ordering::SeqCst),
            Embedder::DEFAULT_MAX_CONCURRENT_BATCHES
        );
    }

    #[tokio::test]
    async fn failed_batch_is_replaced_in_place() {
        let provider = Arc::new(LengthProvider {
            calls: Mutex::new(Vec::new()),
            fail_batch_containing: Some("ccc"),
        });
        let embedder = Embedder::new(provider).with_batch_size(2);

        let out = embedder.embed_batch(&["a", "bb", "ccc", "dddd", "eeeee"]).await;

        assert_eq!(out[0], vec![1.0, 97.0]);
        assert_eq!(out[2], vec![0.0, 0.0]);
        assert_eq!(out[3], vec![0.0, 0.0]);
        assert_eq!(out[4], vec![5.0, 101.0]);
    }

    #[tokio::test]
    async fn without_provider_every_call_gives_identical_placeholders() {
        let embedder = Embedder::placeholder(1024);
        let first = embedder.embed_batch(&["x", "y"]).await;
        let second = embedder.embed_batch(&["x", "y"]).await;
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert!(first.iter().all(|v| v.len() == 1024 && v.iter().all(|x| *x == 0.0)));
        assert_eq!(embedder.embed_query("x").await, None);
        assert_eq!(embedder.embed_one("x").await.len(), 1024);
    }

    #[tokio::test]
    async fn empty_input_makes_no_calls() {
        let provider = Arc::new(LengthProvider::new());
        let embedder = Embedder::new(provider.clone());
        assert!(embedder.embed_batch(&[]).await.is_empty());
        assert!(provider.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn query_embedding_uses_provider() {
        let embedder = Embedder::new(Arc::new(LengthProvider::new()));
        assert_eq!(embedder.embed_query("hi").await, Some(vec![2.0, 104.0]));
        assert_eq!(embedder.model(), Some("length"));
    }
}
