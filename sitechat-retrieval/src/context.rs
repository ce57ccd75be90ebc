//! Prompt context composition
//!
//! Turns ranked chunks into the context block handed to the generation
//! collaborator, and composes the full grounded prompt around a question.

use serde::{Deserialize, Serialize};

use crate::document::ChunkMetadata;

/// Instructions placed ahead of the retrieved context
pub const DEFAULT_PREAMBLE: &str = "You are an expert construction assistant. \
Answer using ONLY the context below, taken from construction documents. \
If the context does not contain the answer, say briefly that no definitive answer was found. \
Cite the sources you used when available.";

/// Sampling parameters passed along with the prompt to the generator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub max_tokens: usize,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 200,
            temperature: 0.2,
            top_p: 0.95,
        }
    }
}

/// Join chunks as `Source: <source>\n<snippet>` blocks separated by blank lines
///
/// The source is emitted verbatim; a chunk without one yields `Source: `.
pub fn format_context(chunks: &[ChunkMetadata]) -> String {
    chunks
        .iter()
        .map(|chunk| format!("Source: {}\n{}", chunk.source, chunk.text_snippet))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Full prompt: preamble, context block, question and answer cue
pub fn compose_prompt(preamble: &str, chunks: &[ChunkMetadata], question: &str) -> String {
    format!(
        "{}\n\nCONTEXT:\n{}\n\nQUESTION: {}\n\nAnswer:",
        preamble.trim_end(),
        format_context(chunks),
        question.trim()
    )
}
