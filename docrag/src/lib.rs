//! # docrag
//!
//! Per-document retrieval for LLM assistants.
//!
//! ## Overview
//!
//! Documents attached to a conversation are split into chunks, embedded, and
//! persisted as one vector collection per document. At query time the
//! relevant passages are found by cosine similarity, with a keyword fallback
//! when no embedding is available, and optionally reranked.
//!
//! - [`split_text`] - paragraph and sentence aware chunking with overlap
//! - [`Embedder`] - batched embeddings with placeholder fallback
//! - [`CollectionStore`] - durable per-document collections on disk
//! - [`SearchEngine`] - cosine ranking, keyword fallback, multi-document merge
//! - [`Reranker`] - optional second pass ([`NoOpReranker`], `HttpReranker`)
//! - [`SummaryGenerator`] - a short abstract stored with each collection
//! - [`DocRag`] - the facade tying them together
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use docrag::{DocRag, Document, ProviderConfig, OpenAIEmbeddingProvider};
//! use std::sync::Arc;
//!
//! let providers = ProviderConfig::from_env();
//! let rag = DocRag::builder()
//!     .root("doc_db/vector_db")
//!     .embedding_provider(Arc::new(OpenAIEmbeddingProvider::new(providers)?))
//!     .build()?;
//!
//! rag.create(&Document::new("doc-1", text)).await?;
//! for hit in rag.search("doc-1", "how are widgets assembled?").await {
//!     println!("{:.3} {}", hit.score, hit.text);
//! }
//! ```
//!
//! ## Features
//!
//! - `openai` (default) - HTTP providers for OpenAI-compatible embedding,
//!   rerank and chat endpoints

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod fallback;
pub mod inmemory;
pub mod locks;
#[cfg(feature = "openai")]
pub mod openai;
pub mod pipeline;
pub mod reranker;
pub mod search;
pub mod similarity;
pub mod store;
pub mod summary;

pub use chunking::split_text;
pub use config::{ProviderConfig, RagConfig, RagConfigBuilder};
pub use document::{
    Chunk, ChunkMetadata, ChunkVector, CollectionStatus, Document, DocumentSource, ScoredChunk,
    StoreStats,
};
pub use embedding::{Embedder, EmbeddingProvider};
pub use error::{ProviderError, ProviderResult, RagError, Result};
pub use inmemory::InMemoryDocumentSource;
#[cfg(feature = "openai")]
pub use openai::{OpenAIChatCompletion, OpenAIEmbeddingProvider};
pub use pipeline::{DocRag, DocRagBuilder};
#[cfg(feature = "openai")]
pub use reranker::HttpReranker;
pub use reranker::{NoOpReranker, RerankHit, Reranker};
pub use search::{DimensionMismatch, SearchEngine, SearchMode, SearchOutcome};
pub use similarity::cosine_similarity;
pub use store::{CollectionStore, LoadedCollection};
pub use summary::{ChatCompletion, SummaryGenerator};
