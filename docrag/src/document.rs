//! Data types for documents, chunks, vectors, and search results.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A source document owned by an external document store.
///
/// The engine only reads `id`, `content`, and the `title` metadata entry;
/// it never mutates documents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Stable identifier for the document.
    pub id: String,
    /// The text content of the document.
    pub content: String,
    /// Key-value metadata (`title`, `created_at`, `generator`, ...).
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Document {
    /// Create a document with empty metadata.
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self { id: id.into(), content: content.into(), metadata: HashMap::new() }
    }

    /// Set a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The document title, or a placeholder built from the id.
    pub fn title(&self) -> String {
        self.metadata.get("title").cloned().unwrap_or_else(|| format!("Document {}", self.id))
    }
}

/// Read access to the external document store.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Fetch a document by id, or `None` if it does not exist.
    async fn get(&self, id: &str) -> Option<Document>;
}

/// Per-chunk metadata persisted alongside chunks and vectors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ChunkMetadata {
    /// Position of the chunk within its collection.
    pub index: usize,
}

/// A segment of a document's text, the unit of retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Opaque unique identifier.
    pub id: String,
    /// The text content of the chunk; never empty.
    pub text: String,
    /// Ordinal and other chunk-level fields.
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// The chunk's position in document order.
    pub fn ordinal(&self) -> usize {
        self.metadata.index
    }
}

/// The embedding of one [`Chunk`], aligned with it by position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkVector {
    /// Id of the chunk this vector belongs to.
    #[serde(rename = "id")]
    pub chunk_id: String,
    /// The embedding values.
    #[serde(rename = "vector")]
    pub embedding: Vec<f32>,
    /// Copy of the chunk's metadata.
    pub metadata: ChunkMetadata,
}

impl ChunkVector {
    /// Dimensionality of the embedding.
    pub fn dim(&self) -> usize {
        self.embedding.len()
    }
}

/// A retrieved chunk paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredChunk {
    /// The chunk text.
    pub text: String,
    /// Similarity or relevance score (higher is more relevant).
    pub score: f32,
    /// Metadata of the chunk.
    pub metadata: ChunkMetadata,
    /// Source document, set by multi-document search.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    /// Source document title, set by multi-document search.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_title: Option<String>,
}

impl ScoredChunk {
    pub(crate) fn from_chunk(chunk: &Chunk, score: f32) -> Self {
        Self {
            text: chunk.text.clone(),
            score,
            metadata: chunk.metadata,
            document_id: None,
            document_title: None,
        }
    }
}

/// Read-only view of a collection.
///
/// Produced by [`CollectionStore::status`](crate::CollectionStore::status);
/// missing or corrupt metadata yields the defaults below rather than an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionStatus {
    /// Both the chunk and the vector artifact are present and readable.
    pub exists: bool,
    /// The chunk artifact is present.
    pub chunks_exist: bool,
    /// The vector artifact is present.
    pub vectors_exist: bool,
    /// Number of chunks in the chunk artifact.
    pub chunk_count: usize,
    /// Creation timestamp from the metadata artifact.
    pub created_at: Option<String>,
    /// Chunk size used to build the collection.
    pub chunk_size: usize,
    /// Chunk overlap used to build the collection.
    pub chunk_overlap: usize,
    /// Generated document abstract.
    pub summary: String,
    /// Embedding dimensionality recorded at build time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_dimensions: Option<usize>,
}

/// Placeholder summary reported when a collection has no readable metadata.
pub const NO_SUMMARY: &str = "no summary";

impl CollectionStatus {
    /// Status of a collection that does not exist.
    pub fn missing() -> Self {
        Self {
            exists: false,
            chunks_exist: false,
            vectors_exist: false,
            chunk_count: 0,
            created_at: None,
            chunk_size: 0,
            chunk_overlap: 0,
            summary: NO_SUMMARY.to_string(),
            embedding_dimensions: None,
        }
    }
}

/// Aggregate counts across every collection in a store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StoreStats {
    /// Number of collection directories.
    pub total_collections: usize,
    /// Sum of chunk counts.
    pub total_chunks: usize,
}
