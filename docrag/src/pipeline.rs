//! The retrieval engine facade.
//!
//! [`DocRag`] wires a [`CollectionStore`] and a [`SearchEngine`] together
//! from one [`RagConfig`] and a set of optional collaborators. Anything not
//! configured degrades to its documented fallback: no embedding provider
//! means placeholder vectors and keyword search, no chat collaborator means
//! the summary sentinel, no reranker means the merged order is kept.
//!
//! # Example
//!
//! ```rust,ignore
//! use docrag::{DocRag, Document, RagConfig};
//!
//! let rag = DocRag::builder()
//!     .config(RagConfig::default())
//!     .root("doc_db/vector_db")
//!     .embedding_provider(Arc::new(OpenAIEmbeddingProvider::new(provider_config.clone())?))
//!     .reranker(Arc::new(HttpReranker::new(provider_config.clone())?))
//!     .chat(Arc::new(OpenAIChatCompletion::new(provider_config)?))
//!     .build()?;
//!
//! rag.create(&Document::new("doc-1", text).with_metadata("title", "Widgets")).await?;
//! let hits = rag.search("doc-1", "what is a widget?").await;
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};

use crate::config::{DEFAULT_EMBEDDING_DIMENSIONS, RagConfig};
use crate::document::{CollectionStatus, Document, DocumentSource, ScoredChunk, StoreStats};
use crate::embedding::{Embedder, EmbeddingProvider};
use crate::error::{RagError, Result};
use crate::reranker::Reranker;
use crate::search::{SearchEngine, SearchOutcome};
use crate::store::CollectionStore;
use crate::summary::{ChatCompletion, SummaryGenerator};

/// The document retrieval engine.
///
/// Construct one via [`DocRag::builder()`]. Chunking parameters, `top_k`
/// and `similarity_threshold` come from the [`RagConfig`].
pub struct DocRag {
    config: RagConfig,
    store: Arc<CollectionStore>,
    engine: SearchEngine,
    documents: Option<Arc<dyn DocumentSource>>,
}

impl std::fmt::Debug for DocRag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocRag")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl DocRag {
    /// Create a new [`DocRagBuilder`].
    pub fn builder() -> DocRagBuilder {
        DocRagBuilder::default()
    }

    /// Return a reference to the configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the collection store.
    pub fn store(&self) -> &Arc<CollectionStore> {
        &self.store
    }

    /// Return a reference to the search engine.
    pub fn engine(&self) -> &SearchEngine {
        &self.engine
    }

    /// Build the collection for `document` with the configured chunking.
    ///
    /// # Errors
    ///
    /// See [`CollectionStore::create`].
    pub async fn create(&self, document: &Document) -> Result<CollectionStatus> {
        self.store
            .create(
                &document.id,
                &document.content,
                &document.metadata,
                self.config.chunk_size,
                self.config.chunk_overlap,
            )
            .await
    }

    /// Fetch `document_id` from the configured document source and build it.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfig`] if no document source is
    /// configured, otherwise see [`CollectionStore::create_from_source`].
    pub async fn create_from_source(&self, document_id: &str) -> Result<CollectionStatus> {
        let documents = self.documents.as_deref().ok_or_else(|| {
            RagError::InvalidConfig("no document source configured".to_string())
        })?;
        self.store
            .create_from_source(
                document_id,
                documents,
                self.config.chunk_size,
                self.config.chunk_overlap,
            )
            .await
    }

    /// Replace the collection for `document`.
    ///
    /// # Errors
    ///
    /// See [`CollectionStore::rebuild`].
    pub async fn rebuild(&self, document: &Document) -> Result<CollectionStatus> {
        self.store
            .rebuild(
                &document.id,
                &document.content,
                &document.metadata,
                self.config.chunk_size,
                self.config.chunk_overlap,
            )
            .await
            .inspect_err(|e| error!(document.id = %document.id, error = %e, "rebuild failed"))
    }

    /// Report the state of a collection.
    pub async fn status(&self, document_id: &str) -> CollectionStatus {
        self.store.status(document_id).await
    }

    /// Delete a collection.
    ///
    /// # Errors
    ///
    /// See [`CollectionStore::delete`].
    pub async fn delete(&self, document_id: &str) -> Result<()> {
        self.store.delete(document_id).await
    }

    /// Document ids that have a collection directory.
    pub async fn list_all(&self) -> Vec<String> {
        self.store.list_all().await
    }

    /// Collection and chunk totals.
    pub async fn stats(&self) -> StoreStats {
        self.store.stats().await
    }

    /// Search one collection: embed → rank → filter by threshold.
    ///
    /// Returns at most `top_k` results ordered by descending score. Results
    /// below the configured `similarity_threshold` are filtered out.
    pub async fn search(&self, document_id: &str, query: &str) -> Vec<ScoredChunk> {
        let outcome = self.search_detailed(document_id, query).await;
        self.above_threshold(outcome.results)
    }

    /// Search one collection and report how the results were ranked.
    ///
    /// The threshold is not applied.
    pub async fn search_detailed(&self, document_id: &str, query: &str) -> SearchOutcome {
        self.engine.search_detailed(document_id, query, self.config.top_k).await
    }

    /// Search several collections, merging and optionally reranking.
    pub async fn search_many(
        &self,
        document_ids: &[&str],
        query: &str,
        rerank: bool,
    ) -> Vec<ScoredChunk> {
        let results = self.engine.search_many(document_ids, query, self.config.top_k, rerank).await;
        self.above_threshold(results)
    }

    /// Rerank arbitrary candidates with the configured reranker.
    pub async fn rerank(
        &self,
        query: &str,
        candidates: Vec<ScoredChunk>,
        top_k: usize,
    ) -> Vec<ScoredChunk> {
        self.engine.rerank(query, candidates, top_k).await
    }

    fn above_threshold(&self, results: Vec<ScoredChunk>) -> Vec<ScoredChunk> {
        let threshold = self.config.similarity_threshold;
        let filtered: Vec<ScoredChunk> =
            results.into_iter().filter(|r| r.score >= threshold).collect();
        info!(result_count = filtered.len(), "query completed");
        filtered
    }
}

/// Builder for constructing a [`DocRag`].
///
/// Only `root` is required. Call [`build()`](DocRagBuilder::build) to
/// validate and produce the engine.
///
/// # Example
///
/// ```rust,ignore
/// let rag = DocRag::builder()
///     .root(temp.path())
///     .placeholder_dimensions(8)      // no provider: zero vectors
///     .document_source(Arc::new(documents))
///     .build()?;
/// ```
#[derive(Default)]
pub struct DocRagBuilder {
    config: Option<RagConfig>,
    root: Option<PathBuf>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    placeholder_dimensions: Option<usize>,
    reranker: Option<Arc<dyn Reranker>>,
    chat: Option<Arc<dyn ChatCompletion>>,
    documents: Option<Arc<dyn DocumentSource>>,
}

impl DocRagBuilder {
    /// Set the configuration. Defaults to [`RagConfig::default`].
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the directory holding one sub-directory per collection.
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Dimensionality of placeholder vectors when no provider is set.
    pub fn placeholder_dimensions(mut self, dimensions: usize) -> Self {
        self.placeholder_dimensions = Some(dimensions);
        self
    }

    /// Set the reranker used by multi-document search.
    pub fn reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Set the chat collaborator used for collection summaries.
    pub fn chat(mut self, chat: Arc<dyn ChatCompletion>) -> Self {
        self.chat = Some(chat);
        self
    }

    /// Set the document source used for `create_from_source` and result titles.
    pub fn document_source(mut self, documents: Arc<dyn DocumentSource>) -> Self {
        self.documents = Some(documents);
        self
    }

    /// Build the [`DocRag`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfig`] if `root` is missing, the
    /// placeholder dimensionality is zero, or the configuration fails
    /// validation.
    pub fn build(self) -> Result<DocRag> {
        let config = self.config.unwrap_or_default();
        RagConfig::validate_chunking(config.chunk_size, config.chunk_overlap)?;
        if config.batch_size == 0 {
            return Err(RagError::InvalidConfig("batch_size must be greater than zero".to_string()));
        }
        if config.max_concurrent_batches == 0 {
            return Err(RagError::InvalidConfig(
                "max_concurrent_batches must be greater than zero".to_string(),
            ));
        }
        let root = self.root.ok_or_else(|| RagError::InvalidConfig("root is required".to_string()))?;

        let embedder = match self.embedding_provider {
            Some(provider) => Embedder::new(provider),
            None => {
                let dimensions = self.placeholder_dimensions.unwrap_or(DEFAULT_EMBEDDING_DIMENSIONS);
                if dimensions == 0 {
                    return Err(RagError::InvalidConfig(
                        "placeholder_dimensions must be greater than zero".to_string(),
                    ));
                }
                Embedder::placeholder(dimensions)
            }
        }
        .with_batch_size(config.batch_size)
        .with_max_concurrent_batches(config.max_concurrent_batches);

        let summarizer = match self.chat {
            Some(chat) => SummaryGenerator::new(chat),
            None => SummaryGenerator::disabled(),
        };

        let store = Arc::new(CollectionStore::new(root, embedder, summarizer));
        let mut engine = SearchEngine::new(store.clone());
        if let Some(reranker) = self.reranker {
            engine = engine.with_reranker(reranker);
        }
        if let Some(documents) = &self.documents {
            engine = engine.with_document_source(documents.clone());
        }

        info!(root = %store.root().display(), embedder = ?store.embedder(), "retrieval engine ready");
        Ok(DocRag { config, store, engine, documents: self.documents })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inmemory::InMemoryDocumentSource;

    #[test]
    fn root_is_required() {
        assert!(matches!(DocRag::builder().build(), Err(RagError::InvalidConfig(_))));
    }

    #[test]
    fn zero_placeholder_dimensions_are_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let result = DocRag::builder().root(temp.path()).placeholder_dimensions(0).build();
        assert!(matches!(result, Err(RagError::InvalidConfig(_))));
    }

    #[test]
    fn embedding_concurrency_comes_from_config() {
        let temp = tempfile::tempdir().unwrap();
        let config = RagConfig::builder().max_concurrent_batches(2).build().unwrap();
        let rag = DocRag::builder().config(config).root(temp.path()).build().unwrap();
        assert_eq!(rag.store().embedder().max_concurrent_batches(), 2);

        let unbounded = RagConfig { max_concurrent_batches: 0, ..RagConfig::default() };
        let result = DocRag::builder().config(unbounded).root(temp.path()).build();
        assert!(matches!(result, Err(RagError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn create_from_source_needs_a_source() {
        let temp = tempfile::tempdir().unwrap();
        let rag = DocRag::builder().root(temp.path()).build().unwrap();
        assert!(matches!(rag.create_from_source("doc").await, Err(RagError::InvalidConfig(_))));

        let documents = InMemoryDocumentSource::new();
        documents.insert(Document::new("doc", "Hello there.").with_metadata("title", "Greeting")).await;
        let rag = DocRag::builder()
            .root(temp.path())
            .placeholder_dimensions(4)
            .document_source(Arc::new(documents))
            .build()
            .unwrap();

        let status = rag.create_from_source("doc").await.unwrap();
        assert!(status.exists);
        assert!(matches!(rag.create_from_source("missing").await, Err(RagError::NotFound(_))));
    }

    #[tokio::test]
    async fn threshold_filters_results() {
        let temp = tempfile::tempdir().unwrap();
        let config = RagConfig::builder().similarity_threshold(0.9).build().unwrap();
        let rag = DocRag::builder()
            .config(config)
            .root(temp.path())
            .placeholder_dimensions(4)
            .build()
            .unwrap();
        rag.create(&Document::new("doc", "Widgets are small.")).await.unwrap();

        // keyword fallback scores 0.8, below the threshold
        assert!(rag.search("doc", "widgets").await.is_empty());
        assert_eq!(rag.search_detailed("doc", "widgets").await.results.len(), 1);
    }
}
