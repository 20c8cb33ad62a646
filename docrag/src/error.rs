//! Error types for the `docrag` crate.

use std::path::PathBuf;

use thiserror::Error;

/// Failures reported by an external provider (embedding, rerank, chat).
///
/// These never reach the caller of the engine directly: the functions in
/// [`fallback`](crate::fallback) turn every variant into its documented
/// degraded result.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    /// No API key was configured for the provider.
    #[error("missing credentials")]
    MissingCredentials,

    /// The request did not complete within the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The provider answered with a non-success status.
    #[error("API returned {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Error detail extracted from the body.
        message: String,
    },

    /// The request could not be sent or the connection failed.
    #[error("request failed: {0}")]
    Transport(String),

    /// The response body did not have the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Errors that can occur in retrieval operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// A configuration validation error.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A provider failed where no fallback applies.
    #[error("Provider unavailable ({provider}): {source}")]
    ProviderUnavailable {
        /// The provider that failed.
        provider: String,
        /// The underlying failure.
        #[source]
        source: ProviderError,
    },

    /// The referenced document or collection does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A collection already exists for the document id.
    #[error("Collection already exists for document '{0}'")]
    AlreadyExists(String),

    /// The document id cannot be used as a storage namespace.
    #[error("Invalid document id '{0}'")]
    InvalidDocumentId(String),

    /// Reading or writing a collection artifact failed.
    #[error("Storage error at {}: {source}", path.display())]
    Storage {
        /// The artifact or directory involved.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An artifact could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The query embedding dimensionality differs from the collection's.
    #[error("Embedding dimensionality mismatch: collection has {expected}, query has {actual}")]
    EmbeddingVersionMismatch {
        /// Dimensionality stored with the collection.
        expected: usize,
        /// Dimensionality of the query embedding.
        actual: usize,
    },
}

impl RagError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage { path: path.into(), source }
    }
}

/// A convenience result type for retrieval operations.
pub type Result<T> = std::result::Result<T, RagError>;

/// Result type returned by provider calls.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;
