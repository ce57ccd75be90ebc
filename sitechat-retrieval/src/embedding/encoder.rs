//! Encoder trait implemented by every embedding backend

use crate::error::Result;

/// A text embedding backend
///
/// Implementations must be deterministic: the same input text always maps to
/// the same vector for a given model.
pub trait TextEncoder: Send + Sync {
    /// Model identifier, recorded in the index header at build time
    fn name(&self) -> &str;

    /// Output vector dimension
    fn dimension(&self) -> usize;

    /// Encode a batch of texts, one row per input, in input order
    fn encode(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;
}
