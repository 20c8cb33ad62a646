//! Query-time retrieval over stored collections.
//!
//! [`SearchEngine::search`] ranks one collection against a query.
//! [`SearchEngine::search_many`] composes it across several documents,
//! tagging each hit with its source, and optionally hands the merged
//! candidates to a [`Reranker`].
//!
//! # Example
//!
//! ```rust,ignore
//! use docrag::{CollectionStore, SearchEngine};
//!
//! let engine = SearchEngine::new(store.clone()).with_reranker(Arc::new(reranker));
//! let hits = engine.search("doc-1", "what is a widget?", 3).await;
//! let merged = engine.search_many(&["doc-1", "doc-2"], "widgets", 5, true).await;
//! ```

use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::document::{DocumentSource, ScoredChunk};
use crate::embedding::Embedder;
use crate::error::{RagError, Result};
use crate::reranker::{NoOpReranker, Reranker};
use crate::similarity::{keyword_search, rank_by_cosine, sort_descending};
use crate::store::CollectionStore;

/// How a search produced its scores.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Cosine similarity against the query embedding.
    Vector,
    /// Substring match; used when no query embedding was available.
    Keyword,
}

/// The collection was built with a different embedding dimensionality than
/// the query has now.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DimensionMismatch {
    /// Dimensionality of the skipped collection vectors.
    pub collection_dim: usize,
    /// Dimensionality of the query embedding.
    pub query_dim: usize,
}

/// Results of a single-collection search plus how they were obtained.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchOutcome {
    /// Scored chunks, best first.
    pub results: Vec<ScoredChunk>,
    /// Ranking mode used.
    pub mode: SearchMode,
    /// Vectors excluded because their dimensionality differs from the query's.
    pub skipped_vectors: usize,
    /// Set when vectors were skipped for dimensionality drift.
    pub dimension_mismatch: Option<DimensionMismatch>,
}

impl SearchOutcome {
    fn empty(mode: SearchMode) -> Self {
        Self { results: Vec::new(), mode, skipped_vectors: 0, dimension_mismatch: None }
    }

    /// Turn a dimensionality drift into an error.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingVersionMismatch`] if any vector was
    /// skipped because its dimensionality differs from the query's.
    pub fn check_dimensions(&self) -> Result<()> {
        match self.dimension_mismatch {
            Some(DimensionMismatch { collection_dim, query_dim }) => {
                Err(RagError::EmbeddingVersionMismatch {
                    expected: collection_dim,
                    actual: query_dim,
                })
            }
            None => Ok(()),
        }
    }
}

/// The similarity search engine.
///
/// Read-only over the store: searches take no locks and never fail. A
/// missing or unreadable collection yields no results.
pub struct SearchEngine {
    store: Arc<CollectionStore>,
    embedder: Embedder,
    reranker: Arc<dyn Reranker>,
    documents: Option<Arc<dyn DocumentSource>>,
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine")
            .field("store", &self.store.root())
            .field("embedder", &self.embedder)
            .field("documents", &self.documents.is_some())
            .finish_non_exhaustive()
    }
}

impl SearchEngine {
    /// Search `store`, embedding queries with the store's own embedder.
    pub fn new(store: Arc<CollectionStore>) -> Self {
        let embedder = store.embedder().clone();
        Self { store, embedder, reranker: Arc::new(NoOpReranker), documents: None }
    }

    /// Use `reranker` for [`search_many`](Self::search_many) and [`rerank`](Self::rerank).
    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = reranker;
        self
    }

    /// Look up result titles in `documents`.
    pub fn with_document_source(mut self, documents: Arc<dyn DocumentSource>) -> Self {
        self.documents = Some(documents);
        self
    }

    /// Rank one collection against `query`, returning at most `top_k` chunks.
    pub async fn search(&self, document_id: &str, query: &str, top_k: usize) -> Vec<ScoredChunk> {
        self.search_detailed(document_id, query, top_k).await.results
    }

    /// Like [`search`](Self::search), also reporting the ranking mode and
    /// any dimensionality drift.
    pub async fn search_detailed(
        &self,
        document_id: &str,
        query: &str,
        top_k: usize,
    ) -> SearchOutcome {
        if top_k == 0 {
            return SearchOutcome::empty(SearchMode::Vector);
        }
        let Some(collection) = self.store.load(document_id).await else {
            debug!(document.id = document_id, "no collection to search");
            return SearchOutcome::empty(SearchMode::Vector);
        };

        let Some(query_vector) = self.embedder.embed_query(query).await else {
            let results = keyword_search(&collection.chunks, query, top_k);
            info!(
                document.id = document_id,
                result_count = results.len(),
                mode = "keyword",
                "search completed"
            );
            return SearchOutcome {
                results,
                mode: SearchMode::Keyword,
                skipped_vectors: 0,
                dimension_mismatch: None,
            };
        };

        let ranked = rank_by_cosine(&collection.chunks, &collection.vectors, &query_vector, top_k);
        let dimension_mismatch = ranked.mismatched_dim.map(|collection_dim| DimensionMismatch {
            collection_dim,
            query_dim: query_vector.len(),
        });
        if let Some(mismatch) = dimension_mismatch {
            warn!(
                document.id = document_id,
                skipped = ranked.skipped,
                collection_dim = mismatch.collection_dim,
                query_dim = mismatch.query_dim,
                "skipping vectors with a different embedding dimensionality; rebuild the collection"
            );
        }

        info!(
            document.id = document_id,
            result_count = ranked.results.len(),
            mode = "vector",
            "search completed"
        );
        SearchOutcome {
            results: ranked.results,
            mode: SearchMode::Vector,
            skipped_vectors: ranked.skipped,
            dimension_mismatch,
        }
    }

    /// Search several collections and merge the results.
    ///
    /// Each document contributes up to `max(1, top_k / n) * 2` candidates,
    /// tagged with its id and title. When `rerank` is set and more than
    /// `top_k` candidates remain, the reranker picks the final list;
    /// otherwise the merged list is cut to `top_k`.
    pub async fn search_many(
        &self,
        document_ids: &[&str],
        query: &str,
        top_k: usize,
        rerank: bool,
    ) -> Vec<ScoredChunk> {
        if query.trim().is_empty() || document_ids.is_empty() || top_k == 0 {
            return Vec::new();
        }
        let per_document = (top_k / document_ids.len()).max(1) * 2;
        debug!(documents = document_ids.len(), per_document, top_k, "multi-document search");

        let per_doc_results = join_all(document_ids.iter().map(|id| async move {
            let results = self.search(id, query, per_document).await;
            if results.is_empty() {
                return results;
            }
            let title = self.title_for(id).await;
            results
                .into_iter()
                .map(|mut hit| {
                    hit.document_id = Some(id.to_string());
                    hit.document_title = Some(title.clone());
                    hit
                })
                .collect::<Vec<_>>()
        }))
        .await;

        let mut merged: Vec<ScoredChunk> = per_doc_results.into_iter().flatten().collect();
        sort_descending(&mut merged);

        let results = if rerank && merged.len() > top_k {
            self.reranker.rerank(query, merged, top_k).await
        } else {
            merged.truncate(top_k);
            merged
        };
        info!(
            documents = document_ids.len(),
            result_count = results.len(),
            "multi-document search completed"
        );
        results
    }

    /// Rerank arbitrary candidates with the configured reranker.
    pub async fn rerank(
        &self,
        query: &str,
        candidates: Vec<ScoredChunk>,
        top_k: usize,
    ) -> Vec<ScoredChunk> {
        self.reranker.rerank(query, candidates, top_k).await
    }

    /// Title from the document source, then the collection metadata.
    async fn title_for(&self, document_id: &str) -> String {
        if let Some(documents) = &self.documents {
            if let Some(document) = documents.get(document_id).await {
                return document.title();
            }
        }
        self.store
            .load(document_id)
            .await
            .and_then(|collection| collection.title)
            .unwrap_or_else(|| format!("Document {document_id}"))
    }
}
