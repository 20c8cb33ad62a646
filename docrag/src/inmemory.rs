//! In-memory document source.
//!
//! This module provides [`InMemoryDocumentSource`], a [`DocumentSource`]
//! backed by a `HashMap` protected by a `tokio::sync::RwLock`. It is suitable
//! for tests, the command line front end, and small embedded uses.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{Document, DocumentSource};

/// An in-memory [`DocumentSource`].
///
/// # Example
///
/// ```rust,ignore
/// use docrag::{Document, InMemoryDocumentSource};
///
/// let source = InMemoryDocumentSource::new();
/// source.insert(Document::new("doc-1", "Some text.")).await;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryDocumentSource {
    documents: RwLock<HashMap<String, Document>>,
}

impl InMemoryDocumentSource {
    /// Create a new empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source pre-populated with documents.
    pub fn with_documents(documents: impl IntoIterator<Item = Document>) -> Self {
        let map = documents.into_iter().map(|doc| (doc.id.clone(), doc)).collect();
        Self { documents: RwLock::new(map) }
    }

    /// Insert or replace a document.
    pub async fn insert(&self, document: Document) {
        let mut documents = self.documents.write().await;
        documents.insert(document.id.clone(), document);
    }

    /// Remove a document, returning it if present.
    pub async fn remove(&self, id: &str) -> Option<Document> {
        let mut documents = self.documents.write().await;
        documents.remove(id)
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Whether the source holds no documents.
    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl DocumentSource for InMemoryDocumentSource {
    async fn get(&self, id: &str) -> Option<Document> {
        let documents = self.documents.read().await;
        documents.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_get_remove() {
        let source = InMemoryDocumentSource::new();
        assert!(source.is_empty().await);

        source.insert(Document::new("a", "alpha").with_metadata("title", "Alpha")).await;
        let doc = source.get("a").await.unwrap();
        assert_eq!(doc.content, "alpha");
        assert_eq!(doc.title(), "Alpha");
        assert_eq!(source.len().await, 1);

        assert!(source.remove("a").await.is_some());
        assert!(source.get("a").await.is_none());
    }

    #[tokio::test]
    async fn title_falls_back_to_id() {
        let source = InMemoryDocumentSource::with_documents([Document::new("x1", "text")]);
        assert_eq!(source.get("x1").await.unwrap().title(), "Document x1");
    }
}
