//! Error types for sitechat-retrieval

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while embedding, persisting or querying the index
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Embedding model could not be resolved or loaded
    #[error("Model load error: {0}")]
    ModelLoad(String),

    /// Embedding generation error
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Index artifacts exist but cannot be parsed
    #[error("Corrupt index at {}: {reason}", path.display())]
    CorruptIndex { path: PathBuf, reason: String },

    /// Vector count and metadata count disagree
    #[error("Index has {vectors} vectors but {metadata} metadata records")]
    IndexMetadataMismatch { vectors: usize, metadata: usize },

    /// Vector dimension does not match the index dimension
    #[error("Dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Invalid path
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Serialization error (bincode)
    #[error("Serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RetrievalError {
    /// Create a model load error
    pub fn model_load(msg: impl Into<String>) -> Self {
        Self::ModelLoad(msg.into())
    }

    /// Create an embedding error
    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::Embedding(msg.into())
    }

    /// Create a corrupt index error for an artifact
    pub fn corrupt(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self::CorruptIndex {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Create an invalid path error
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// Whether the error means the on-disk index cannot be trusted
    pub fn is_corrupt_index(&self) -> bool {
        matches!(
            self,
            Self::CorruptIndex { .. } | Self::IndexMetadataMismatch { .. }
        )
    }
}

/// Result type for retrieval operations
pub type Result<T> = std::result::Result<T, RetrievalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrupt_index_display() {
        let err = RetrievalError::corrupt("vector_store/meta.json", "expected value");
        assert_eq!(
            err.to_string(),
            "Corrupt index at vector_store/meta.json: expected value"
        );
        assert!(err.is_corrupt_index());
    }

    #[test]
    fn test_mismatch_display() {
        let err = RetrievalError::IndexMetadataMismatch {
            vectors: 3,
            metadata: 2,
        };
        assert_eq!(err.to_string(), "Index has 3 vectors but 2 metadata records");
        assert!(err.is_corrupt_index());
    }

    #[test]
    fn test_model_load_is_not_corrupt() {
        let err = RetrievalError::model_load("unknown model: foo");
        assert_eq!(err.to_string(), "Model load error: unknown model: foo");
        assert!(!err.is_corrupt_index());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: RetrievalError = io_err.into();
        assert!(matches!(err, RetrievalError::Io(_)));
    }
}
