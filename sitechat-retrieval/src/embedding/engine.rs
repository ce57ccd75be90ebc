//! Vector embedding engine
//!
//! High-level API for generating and caching embeddings.

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

use super::encoder::TextEncoder;
use super::fastembed_encoder::FastEmbedEncoder;
use super::hashing::HashEncoder;
use crate::config::RetrievalConfig;
use crate::error::{Result, RetrievalError};

/// Number of embeddings kept in the cache unless configured otherwise
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Vector embedding engine with caching
///
/// Wraps a `TextEncoder` with a bounded LRU cache for repeated lookups.
/// Construct one per process and share it; it is never mutated apart from
/// the cache.
pub struct VectorEngine {
    encoder: Arc<dyn TextEncoder>,
    cache: Mutex<LruCache<String, Vec<f32>>>,
    dimension: usize,
}

impl VectorEngine {
    /// Create the engine for the configured model
    ///
    /// `hash` / `hash:<dim>` selects the feature-hashing encoder; anything else
    /// is resolved as a fastembed model. Fails with `ModelLoad` when the model
    /// cannot be resolved or loaded.
    pub fn from_config(config: &RetrievalConfig) -> Result<Self> {
        let encoder: Arc<dyn TextEncoder> = match HashEncoder::from_model_name(&config.embed_model)
        {
            Some(hash) => Arc::new(hash?),
            None => Arc::new(FastEmbedEncoder::load(
                &config.embed_model,
                &config.resolved_model_cache_dir(),
            )?),
        };

        log::info!(
            "VectorEngine ready ({}, {}d)",
            encoder.name(),
            encoder.dimension()
        );

        Ok(Self::with_encoder(encoder))
    }

    /// Create the engine around an already constructed encoder
    pub fn with_encoder(encoder: Arc<dyn TextEncoder>) -> Self {
        let dimension = encoder.dimension();
        Self {
            encoder,
            cache: Mutex::new(LruCache::new(cache_capacity(DEFAULT_CACHE_CAPACITY))),
            dimension,
        }
    }

    /// Bound the cache to `capacity` entries (a zero capacity means one)
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache = Mutex::new(LruCache::new(cache_capacity(capacity)));
        self
    }

    /// Embed a batch of texts, one row per input in input order
    ///
    /// An empty batch returns an empty result without touching the model.
    pub fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        // Check cache for all texts
        let mut results: Vec<Option<Vec<f32>>> = {
            let mut cache = self.cache.lock();
            texts.iter().map(|text| cache.get(*text).cloned()).collect()
        };

        let uncached: Vec<(usize, &str)> = results
            .iter()
            .enumerate()
            .filter(|(_, cached)| cached.is_none())
            .map(|(i, _)| (i, texts[i]))
            .collect();

        if uncached.is_empty() {
            return Ok(results.into_iter().flatten().collect());
        }

        let uncached_texts: Vec<&str> = uncached.iter().map(|(_, t)| *t).collect();
        let new_embeddings = self.encoder.encode(&uncached_texts)?;

        if new_embeddings.len() != uncached_texts.len() {
            return Err(RetrievalError::embedding(format!(
                "encoder returned {} vectors for {} texts",
                new_embeddings.len(),
                uncached_texts.len()
            )));
        }

        if let Some(bad) = new_embeddings.iter().find(|e| e.len() != self.dimension) {
            return Err(RetrievalError::embedding(format!(
                "encoder returned a {}d vector, expected {}d",
                bad.len(),
                self.dimension
            )));
        }

        let mut cache = self.cache.lock();
        for ((idx, text), emb) in uncached.iter().zip(new_embeddings.into_iter()) {
            cache.put(text.to_string(), emb.clone());
            results[*idx] = Some(emb);
        }
        drop(cache);

        Ok(results.into_iter().flatten().collect())
    }

    /// Get embedding dimension
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Identifier of the underlying model
    pub fn model_name(&self) -> &str {
        self.encoder.name()
    }

    /// Get cache size
    pub fn cache_size(&self) -> usize {
        self.cache.lock().len()
    }

    /// Clear the cache
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }
}

fn cache_capacity(capacity: usize) -> NonZeroUsize {
    NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)
}
