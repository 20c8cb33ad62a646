//! Durable per-document vector collections.
//!
//! Each collection lives in its own directory under the store root:
//!
//! ```text
//! <root>/<document_id>/chunks.json    [{id, text, metadata: {index}}]
//! <root>/<document_id>/vectors.json   [{id, vector: [f32], metadata: {index}}]
//! <root>/<document_id>/metadata.json  {original_metadata, vector_db_created_at, ...}
//! ```
//!
//! A collection exists when both `chunks.json` and `vectors.json` are present,
//! readable, and of equal length. `vectors.json` is always written last, so a
//! build that fails part way leaves a collection that reports as missing.
//! Every artifact is written to a temporary file and renamed into place.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::chunking::split_text;
use crate::config::RagConfig;
use crate::document::{
    Chunk, ChunkVector, CollectionStatus, DocumentSource, NO_SUMMARY, StoreStats,
};
use crate::embedding::Embedder;
use crate::error::{RagError, Result};
use crate::locks::KeyedLocks;
use crate::summary::SummaryGenerator;

const CHUNKS_FILE: &str = "chunks.json";
const VECTORS_FILE: &str = "vectors.json";
const METADATA_FILE: &str = "metadata.json";

/// Contents of `metadata.json`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct StoredMetadata {
    #[serde(default)]
    original_metadata: serde_json::Value,
    #[serde(default)]
    vector_db_created_at: Option<String>,
    #[serde(default)]
    chunk_size: usize,
    #[serde(default)]
    chunk_overlap: usize,
    #[serde(default)]
    document_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    embedding_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    embedding_dimensions: Option<usize>,
}

/// A collection read back from disk, ready for search.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedCollection {
    /// Document the collection belongs to.
    pub document_id: String,
    /// Chunks in document order.
    pub chunks: Vec<Chunk>,
    /// Vectors aligned with `chunks` by position.
    pub vectors: Vec<ChunkVector>,
    /// Dimensionality recorded when the collection was built.
    pub embedding_dimensions: Option<usize>,
    /// Document title recorded when the collection was built.
    pub title: Option<String>,
}

/// The vector collection store.
///
/// Owns the on-disk representation of every collection. Builds and deletions
/// of the same document id are serialised through a per-id lock; reads take
/// no lock and see either the previous or the new state of each artifact.
///
/// # Example
///
/// ```rust,ignore
/// use docrag::{CollectionStore, Embedder, SummaryGenerator};
///
/// let store = CollectionStore::new("doc_db/vector_db", Embedder::default(), SummaryGenerator::disabled());
/// store.create("doc-1", "A.\n\nB.\n\nC.", &HashMap::new(), 500, 100).await?;
/// assert!(store.status("doc-1").await.exists);
/// ```
#[derive(Debug)]
pub struct CollectionStore {
    root: PathBuf,
    embedder: Embedder,
    summarizer: SummaryGenerator,
    locks: KeyedLocks,
}

impl CollectionStore {
    /// Create a store rooted at `root`. The directory is created on first build.
    pub fn new(root: impl Into<PathBuf>, embedder: Embedder, summarizer: SummaryGenerator) -> Self {
        Self { root: root.into(), embedder, summarizer, locks: KeyedLocks::new() }
    }

    /// The store root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The embedding adapter used for builds.
    pub fn embedder(&self) -> &Embedder {
        &self.embedder
    }

    /// Build the collection for a document.
    ///
    /// Chunks `content`, embeds every chunk, generates a summary, and persists
    /// metadata, chunks and vectors in that order.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidDocumentId`] if the id cannot name a directory
    /// - [`RagError::InvalidConfig`] for an unusable chunk size / overlap
    /// - [`RagError::AlreadyExists`] if the collection exists; use [`rebuild`](Self::rebuild)
    /// - [`RagError::Storage`] / [`RagError::Serialization`] if writing fails
    pub async fn create(
        &self,
        document_id: &str,
        content: &str,
        doc_metadata: &HashMap<String, String>,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Result<CollectionStatus> {
        let dir = self.collection_dir(document_id)?;
        RagConfig::validate_chunking(chunk_size, chunk_overlap)?;

        let _guard = self.locks.lock(document_id).await;
        if self.status(document_id).await.exists {
            warn!(document.id = document_id, "collection already exists");
            return Err(RagError::AlreadyExists(document_id.to_string()));
        }
        self.build_locked(document_id, &dir, content, doc_metadata, chunk_size, chunk_overlap)
            .await
    }

    /// Fetch a document from `source` and build its collection.
    ///
    /// # Errors
    ///
    /// [`RagError::NotFound`] if the source has no such document, otherwise
    /// as [`create`](Self::create).
    pub async fn create_from_source(
        &self,
        document_id: &str,
        source: &dyn DocumentSource,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Result<CollectionStatus> {
        let document = source
            .get(document_id)
            .await
            .ok_or_else(|| RagError::NotFound(format!("document '{document_id}'")))?;
        self.create(document_id, &document.content, &document.metadata, chunk_size, chunk_overlap)
            .await
    }

    /// Delete any existing collection for the document and build a new one.
    ///
    /// Both steps run under the same per-document lock.
    pub async fn rebuild(
        &self,
        document_id: &str,
        content: &str,
        doc_metadata: &HashMap<String, String>,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Result<CollectionStatus> {
        let dir = self.collection_dir(document_id)?;
        RagConfig::validate_chunking(chunk_size, chunk_overlap)?;

        let _guard = self.locks.lock(document_id).await;
        self.delete_locked(document_id, &dir).await?;
        self.build_locked(document_id, &dir, content, doc_metadata, chunk_size, chunk_overlap)
            .await
    }

    async fn build_locked(
        &self,
        document_id: &str,
        dir: &Path,
        content: &str,
        doc_metadata: &HashMap<String, String>,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Result<CollectionStatus> {
        let title =
            doc_metadata.get("title").cloned().unwrap_or_else(|| format!("Document {document_id}"));
        info!(document.id = document_id, %title, chunk_size, chunk_overlap, "building collection");

        let chunks = split_text(content, chunk_size, chunk_overlap)?;
        debug!(document.id = document_id, chunk_count = chunks.len(), "document chunked");

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await;
        let vectors: Vec<ChunkVector> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| ChunkVector {
                chunk_id: chunk.id.clone(),
                embedding,
                metadata: chunk.metadata,
            })
            .collect();

        let summary = self.summarizer.summarize(content, &title).await;

        let metadata = StoredMetadata {
            original_metadata: serde_json::to_value(doc_metadata)?,
            vector_db_created_at: Some(chrono::Utc::now().to_rfc3339()),
            chunk_size,
            chunk_overlap,
            document_summary: Some(summary),
            embedding_model: self.embedder.model().map(str::to_string),
            embedding_dimensions: Some(self.embedder.dimensions()),
        };

        if let Err(e) = write_artifacts(dir, &metadata, &chunks, &vectors).await {
            error!(document.id = document_id, error = %e, "failed to write collection");
            return Err(e);
        }

        info!(document.id = document_id, chunk_count = chunks.len(), "collection created");
        Ok(self.status(document_id).await)
    }

    /// Report whether a collection exists and what it was built with.
    ///
    /// Never fails: unreadable artifacts count as absent and missing or
    /// corrupt metadata yields default values.
    pub async fn status(&self, document_id: &str) -> CollectionStatus {
        let Ok(dir) = self.collection_dir(document_id) else {
            return CollectionStatus::missing();
        };

        let chunks_path = dir.join(CHUNKS_FILE);
        let vectors_path = dir.join(VECTORS_FILE);
        let chunks_exist = path_exists(&chunks_path).await;
        let vectors_exist = path_exists(&vectors_path).await;

        let chunks: Option<Vec<IgnoredAny>> = read_json(&chunks_path).await;
        let vectors: Option<Vec<IgnoredAny>> = read_json(&vectors_path).await;
        let chunk_count = chunks.as_ref().map_or(0, Vec::len);
        let exists = matches!((&chunks, &vectors), (Some(c), Some(v)) if c.len() == v.len());

        let metadata: StoredMetadata =
            read_json(&dir.join(METADATA_FILE)).await.unwrap_or_default();

        CollectionStatus {
            exists,
            chunks_exist,
            vectors_exist,
            chunk_count,
            created_at: metadata.vector_db_created_at,
            chunk_size: metadata.chunk_size,
            chunk_overlap: metadata.chunk_overlap,
            summary: metadata.document_summary.unwrap_or_else(|| NO_SUMMARY.to_string()),
            embedding_dimensions: metadata.embedding_dimensions,
        }
    }

    /// Load a collection for search.
    ///
    /// Returns `None` if the collection is missing, unreadable, or its
    /// chunks and vectors are not aligned.
    pub async fn load(&self, document_id: &str) -> Option<LoadedCollection> {
        let dir = self.collection_dir(document_id).ok()?;
        let chunks: Vec<Chunk> = read_json(&dir.join(CHUNKS_FILE)).await?;
        let vectors: Vec<ChunkVector> = read_json(&dir.join(VECTORS_FILE)).await?;

        let aligned = chunks.len() == vectors.len()
            && chunks.iter().zip(&vectors).all(|(c, v)| c.id == v.chunk_id);
        if !aligned {
            warn!(
                document.id = document_id,
                chunks = chunks.len(),
                vectors = vectors.len(),
                "collection chunks and vectors are misaligned"
            );
            return None;
        }

        let metadata: StoredMetadata =
            read_json(&dir.join(METADATA_FILE)).await.unwrap_or_default();
        let embedding_dimensions =
            metadata.embedding_dimensions.or_else(|| vectors.first().map(ChunkVector::dim));
        let title = metadata
            .original_metadata
            .get("title")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string);

        Some(LoadedCollection {
            document_id: document_id.to_string(),
            chunks,
            vectors,
            embedding_dimensions,
            title,
        })
    }

    /// Remove every artifact of a collection.
    ///
    /// Deleting a collection that does not exist succeeds.
    ///
    /// # Errors
    ///
    /// [`RagError::InvalidDocumentId`] or [`RagError::Storage`].
    pub async fn delete(&self, document_id: &str) -> Result<()> {
        let dir = self.collection_dir(document_id)?;
        let _guard = self.locks.lock(document_id).await;
        self.delete_locked(document_id, &dir).await
    }

    /// Move the directory aside in one rename, then remove it.
    async fn delete_locked(&self, document_id: &str, dir: &Path) -> Result<()> {
        let tombstone = self.root.join(format!(".deleting-{}", Uuid::new_v4()));
        match tokio::fs::rename(dir, &tombstone).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(document.id = document_id, "no collection to delete");
                return Ok(());
            }
            Err(e) => {
                error!(document.id = document_id, error = %e, "failed to delete collection");
                return Err(RagError::storage(dir, e));
            }
        }

        if let Err(e) = tokio::fs::remove_dir_all(&tombstone).await {
            // the collection is already gone from the caller's point of view
            warn!(path = %tombstone.display(), error = %e, "failed to remove deleted collection files");
        }
        info!(document.id = document_id, "collection deleted");
        Ok(())
    }

    /// Document ids with a collection directory, sorted.
    ///
    /// An unreadable root yields an empty list.
    pub async fn list_all(&self) -> Vec<String> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    warn!(root = %self.root.display(), error = %e, "failed to list collections");
                }
                return Vec::new();
            }
        };

        let mut ids = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
                    let name = entry.file_name().to_string_lossy().into_owned();
                    if is_dir && !name.starts_with('.') {
                        ids.push(name);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(root = %self.root.display(), error = %e, "failed to read collection entry");
                    break;
                }
            }
        }
        ids.sort();
        ids
    }

    /// Collection and chunk totals across the store.
    pub async fn stats(&self) -> StoreStats {
        let ids = self.list_all().await;
        let mut total_chunks = 0;
        for id in &ids {
            total_chunks += self.status(id).await.chunk_count;
        }
        StoreStats { total_collections: ids.len(), total_chunks }
    }

    fn collection_dir(&self, document_id: &str) -> Result<PathBuf> {
        validate_document_id(document_id)?;
        Ok(self.root.join(document_id))
    }
}

/// Reject ids that are not a single, visible path component.
fn validate_document_id(document_id: &str) -> Result<()> {
    let invalid = document_id.trim().is_empty()
        || document_id.starts_with('.')
        || document_id.chars().any(|c| matches!(c, '/' | '\\' | '\0'))
        || document_id.contains(':');
    if invalid {
        return Err(RagError::InvalidDocumentId(document_id.to_string()));
    }
    Ok(())
}

async fn write_artifacts(
    dir: &Path,
    metadata: &StoredMetadata,
    chunks: &[Chunk],
    vectors: &[ChunkVector],
) -> Result<()> {
    // leftovers of an earlier failed build must not pair with the new chunks
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => debug!(path = %dir.display(), "cleared partial collection"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(RagError::storage(dir, e)),
    }
    tokio::fs::create_dir_all(dir).await.map_err(|e| RagError::storage(dir, e))?;

    write_json_atomic(&dir.join(METADATA_FILE), metadata).await?;
    write_json_atomic(&dir.join(CHUNKS_FILE), chunks).await?;
    write_json_atomic(&dir.join(VECTORS_FILE), vectors).await
}

async fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));

    tokio::fs::write(&tmp, &bytes).await.map_err(|e| RagError::storage(&tmp, e))?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(RagError::storage(path, e));
    }
    Ok(())
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            if e.kind() != ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "failed to read artifact");
            }
            return None;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to parse artifact");
            None
        }
    }
}

async fn path_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(root: &Path) -> CollectionStore {
        CollectionStore::new(root, Embedder::placeholder(8), SummaryGenerator::disabled())
    }

    fn meta(title: &str) -> HashMap<String, String> {
        HashMap::from([("title".to_string(), title.to_string())])
    }

    #[test]
    fn document_ids_must_be_single_components() {
        for bad in ["", "  ", "../x", "a/b", "a\\b", ".hidden", "c:x"] {
            assert!(validate_document_id(bad).is_err(), "{bad:?} should be rejected");
        }
        for good in ["doc-1", "3f2a9c1e-uuid", "文档"] {
            assert!(validate_document_id(good).is_ok(), "{good:?} should be accepted");
        }
    }

    #[tokio::test]
    async fn create_writes_three_artifacts() {
        let temp = tempfile::tempdir().unwrap();
        let store = store(temp.path());

        let status = store.create("doc", "A.\n\nB.\n\nC.", &meta("Letters"), 5, 0).await.unwrap();

        assert!(status.exists);
        assert_eq!(status.chunk_count, 3);
        assert_eq!(status.chunk_size, 5);
        assert_eq!(status.embedding_dimensions, Some(8));
        assert!(status.created_at.is_some());
        for file in [CHUNKS_FILE, VECTORS_FILE, METADATA_FILE] {
            assert!(temp.path().join("doc").join(file).exists(), "{file} missing");
        }

        let raw = std::fs::read_to_string(temp.path().join("doc").join(METADATA_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["original_metadata"]["title"], "Letters");
        assert_eq!(value["document_summary"], crate::fallback::SUMMARY_SENTINEL);
    }

    #[tokio::test]
    async fn loaded_vectors_align_with_chunks() {
        let temp = tempfile::tempdir().unwrap();
        let store = store(temp.path());
        store.create("doc", "One.\n\nTwo.\n\nThree.\n\nFour.", &meta("t"), 6, 0).await.unwrap();

        let loaded = store.load("doc").await.unwrap();
        assert_eq!(loaded.chunks.len(), loaded.vectors.len());
        for (i, (chunk, vector)) in loaded.chunks.iter().zip(&loaded.vectors).enumerate() {
            assert_eq!(chunk.id, vector.chunk_id);
            assert_eq!(chunk.ordinal(), i);
            assert_eq!(vector.dim(), 8);
        }
        assert_eq!(loaded.title.as_deref(), Some("t"));
        assert_eq!(loaded.embedding_dimensions, Some(8));
    }

    #[tokio::test]
    async fn missing_vectors_means_not_existing() {
        let temp = tempfile::tempdir().unwrap();
        let store = store(temp.path());
        store.create("doc", "text", &meta("t"), 50, 0).await.unwrap();
        std::fs::remove_file(temp.path().join("doc").join(VECTORS_FILE)).unwrap();

        let status = store.status("doc").await;
        assert!(!status.exists);
        assert!(status.chunks_exist);
        assert!(!status.vectors_exist);
        assert!(store.load("doc").await.is_none());
    }

    #[tokio::test]
    async fn corrupt_metadata_yields_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let store = store(temp.path());
        store.create("doc", "text", &meta("t"), 50, 0).await.unwrap();
        std::fs::write(temp.path().join("doc").join(METADATA_FILE), "{not json").unwrap();

        let status = store.status("doc").await;
        assert!(status.exists);
        assert_eq!(status.chunk_count, 1);
        assert_eq!(status.created_at, None);
        assert_eq!(status.chunk_size, 0);
        assert_eq!(status.summary, NO_SUMMARY);
    }

    #[tokio::test]
    async fn corrupt_vectors_means_not_existing() {
        let temp = tempfile::tempdir().unwrap();
        let store = store(temp.path());
        store.create("doc", "text", &meta("t"), 50, 0).await.unwrap();
        std::fs::write(temp.path().join("doc").join(VECTORS_FILE), "[{\"id\":").unwrap();

        assert!(!store.status("doc").await.exists);
    }

    #[tokio::test]
    async fn create_twice_is_rejected_and_rebuild_replaces() {
        let temp = tempfile::tempdir().unwrap();
        let store = store(temp.path());
        store.create("doc", "A.\n\nB.", &meta("t"), 2, 0).await.unwrap();

        let err = store.create("doc", "C.", &meta("t"), 2, 0).await.unwrap_err();
        assert!(matches!(err, RagError::AlreadyExists(_)));

        let status = store.rebuild("doc", "C.", &meta("t"), 2, 0).await.unwrap();
        assert_eq!(status.chunk_count, 1);
        assert_eq!(store.load("doc").await.unwrap().chunks[0].text, "C.");
    }

    #[tokio::test]
    async fn partial_leftovers_are_replaced() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("doc");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(VECTORS_FILE), "[]").unwrap();

        let store = store(temp.path());
        assert!(!store.status("doc").await.exists);
        let status = store.create("doc", "Fresh.", &meta("t"), 50, 0).await.unwrap();
        assert!(status.exists);
        assert_eq!(status.chunk_count, 1);
    }

    #[tokio::test]
    async fn delete_is_complete_and_idempotent() {
        let temp = tempfile::tempdir().unwrap();
        let store = store(temp.path());
        store.create("doc", "text", &meta("t"), 50, 0).await.unwrap();

        store.delete("doc").await.unwrap();
        assert!(!store.status("doc").await.exists);
        assert!(!temp.path().join("doc").exists());
        assert!(store.list_all().await.is_empty());

        store.delete("doc").await.unwrap();
        store.delete("never-created").await.unwrap();
    }

    #[tokio::test]
    async fn ids_near_the_name_limit_can_be_deleted() {
        let temp = tempfile::tempdir().unwrap();
        let store = store(temp.path());
        let long_id = "d".repeat(240);
        store.create(&long_id, "text", &meta("t"), 50, 0).await.unwrap();

        store.delete(&long_id).await.unwrap();

        assert!(!store.status(&long_id).await.exists);
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn list_and_stats() {
        let temp = tempfile::tempdir().unwrap();
        let store = store(temp.path());
        assert!(store.list_all().await.is_empty());
        assert_eq!(store.stats().await, StoreStats::default());

        store.create("b", "A.\n\nB.", &meta("b"), 2, 0).await.unwrap();
        store.create("a", "Only.", &meta("a"), 50, 0).await.unwrap();
        std::fs::write(temp.path().join("stray.txt"), "x").unwrap();

        assert_eq!(store.list_all().await, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(store.stats().await, StoreStats { total_collections: 2, total_chunks: 3 });
    }

    #[tokio::test]
    async fn missing_root_lists_nothing() {
        let temp = tempfile::tempdir().unwrap();
        let store = store(&temp.path().join("absent"));
        assert!(store.list_all().await.is_empty());
        assert!(!store.status("doc").await.exists);
    }

    #[tokio::test]
    async fn invalid_inputs_are_rejected_before_writing() {
        let temp = tempfile::tempdir().unwrap();
        let store = store(temp.path());
        assert!(matches!(
            store.create("../escape", "x", &meta("t"), 10, 0).await,
            Err(RagError::InvalidDocumentId(_))
        ));
        assert!(matches!(
            store.create("doc", "x", &meta("t"), 0, 0).await,
            Err(RagError::InvalidConfig(_))
        ));
        assert!(store.list_all().await.is_empty());
    }

    #[tokio::test]
    async fn empty_content_builds_an_empty_collection() {
        let temp = tempfile::tempdir().unwrap();
        let store = store(temp.path());
        let status = store.create("doc", "   ", &meta("t"), 10, 0).await.unwrap();
        assert!(status.exists);
        assert_eq!(status.chunk_count, 0);
    }

    #[tokio::test]
    async fn concurrent_creates_of_one_id_build_once() {
        let temp = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(store(temp.path()));

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    store.create("doc", "A.\n\nB.", &HashMap::new(), 2, 0).await
                })
            })
            .collect();

        let mut created = 0;
        let mut rejected = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => created += 1,
                Err(RagError::AlreadyExists(_)) => rejected += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!((created, rejected), (1, 3));
        assert_eq!(store.status("doc").await.chunk_count, 2);
    }
}
