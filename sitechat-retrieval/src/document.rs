//! Document and chunk metadata types
//!
//! A `Document` is consumed once at build time; the `ChunkMetadata` derived
//! from it is what gets persisted next to each indexed vector.

use serde::{Deserialize, Serialize};

/// Maximum number of characters kept in a chunk snippet
pub const SNIPPET_CHARS: usize = 400;

/// An input unit supplied by document ingestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier
    pub id: String,
    /// Full content
    pub text: String,
    /// Origin label, e.g. a filename
    #[serde(default)]
    pub source: String,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            source: source.into(),
        }
    }
}

/// Record stored per indexed vector, positionally aligned with the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Copied from `Document::id`
    pub id: String,
    /// Copied from `Document::source`
    pub source: String,
    /// First `SNIPPET_CHARS` characters of the document text
    pub text_snippet: String,
}

impl ChunkMetadata {
    pub fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            source: doc.source.clone(),
            text_snippet: snippet(&doc.text).to_string(),
        }
    }

    /// Source label for human-facing output, `"unknown"` when empty
    pub fn source_label(&self) -> &str {
        if self.source.is_empty() {
            "unknown"
        } else {
            &self.source
        }
    }
}

impl From<&Document> for ChunkMetadata {
    fn from(doc: &Document) -> Self {
        Self::from_document(doc)
    }
}

/// Prefix of `text` holding at most `SNIPPET_CHARS` characters
///
/// Counts characters, not bytes, so multi-byte text is never split inside a
/// code point.
pub fn snippet(text: &str) -> &str {
    match text.char_indices().nth(SNIPPET_CHARS) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
