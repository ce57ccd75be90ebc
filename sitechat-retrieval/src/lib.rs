//! Sitechat Retrieval Core
//!
//! Embeds documents, keeps them in a flat inner-product index on disk, and
//! serves top-k nearest-neighbor queries for the chat front end.
//!
//! ## Features
//!
//! - **Pluggable embedders** - fastembed sentence-transformer models, or a deterministic hashing encoder
//! - **Exact cosine search** - unit-normalized vectors scored by inner product, optional HNSW
//! - **Aligned persistence** - `index.bin` + `meta.json`, validated against each other on load
//! - **Prompt context** - ranked snippets formatted for the generation model
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sitechat_retrieval::{Document, Retriever, RetrievalConfig, VectorEngine};
//!
//! let config = RetrievalConfig::from_env();
//! let engine = Arc::new(VectorEngine::from_config(&config)?);
//! let retriever = Retriever::from_config(engine, &config);
//!
//! retriever.build(&[Document::new("1", "concrete mix ratios", "concrete.txt")])?;
//! let hits = retriever.query("how much cement per cubic metre?", 3)?;
//! ```

pub mod config;
pub mod context;
pub mod document;
pub mod embedding;
pub mod error;
pub mod index;
pub mod retriever;
pub mod store;

// Re-exports for convenience
pub use config::{RetrievalConfig, SearchMode};
pub use context::{compose_prompt, format_context, GenerationParams, DEFAULT_PREAMBLE};
pub use document::{ChunkMetadata, Document, SNIPPET_CHARS};
pub use embedding::{
    FastEmbedEncoder, HashEncoder, TextEncoder, VectorEngine, DEFAULT_CACHE_CAPACITY,
};
pub use error::{Result, RetrievalError};
pub use index::{normalize_l2, FlatIndex, Neighbor};
pub use retriever::{Retriever, ScoredChunk};
pub use store::{IndexHeader, IndexStore, LoadedIndex};
