//! Index build and top-k query
//!
//! `build` turns documents into a normalized flat index and persists it;
//! `query` loads the persisted index and maps nearest neighbors back to
//! their chunk metadata.

use std::sync::Arc;

use crate::config::{RetrievalConfig, SearchMode};
use crate::document::{ChunkMetadata, Document};
use crate::embedding::VectorEngine;
use crate::error::{Result, RetrievalError};
use crate::index::{normalize_l2, FlatIndex};
use crate::store::{IndexStore, LoadedIndex};

/// Query hit with its similarity score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub metadata: ChunkMetadata,
    /// Inner product of unit vectors (cosine similarity)
    pub score: f32,
}

/// Builds and queries the persisted index
pub struct Retriever {
    engine: Arc<VectorEngine>,
    store: IndexStore,
    search_mode: SearchMode,
}

impl Retriever {
    pub fn new(engine: Arc<VectorEngine>, store: IndexStore) -> Self {
        Self {
            engine,
            store,
            search_mode: SearchMode::Exact,
        }
    }

    /// Retriever over the configured store directory and search mode
    pub fn from_config(engine: Arc<VectorEngine>, config: &RetrievalConfig) -> Self {
        Self::new(engine, IndexStore::from_config(config)).with_search_mode(config.search_mode)
    }

    pub fn with_search_mode(mut self, mode: SearchMode) -> Self {
        self.search_mode = mode;
        self
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    /// Embed and L2-normalize texts
    ///
    /// Degenerate texts (zero-norm embedding) come back as `None`.
    pub fn embed_normalized(&self, texts: &[&str]) -> Result<Vec<Option<Vec<f32>>>> {
        let embeddings = self.engine.embed(texts)?;
        Ok(embeddings
            .into_iter()
            .map(|mut v| normalize_l2(&mut v).then_some(v))
            .collect())
    }

    /// Build a fresh index from `docs`, persist it, and return it
    ///
    /// Documents whose embedding is degenerate are left out of both the index
    /// and the metadata so the two stay aligned.
    pub fn build(&self, docs: &[Document]) -> Result<LoadedIndex> {
        log::info!("Building index from {} documents", docs.len());

        let texts: Vec<&str> = docs.iter().map(|d| d.text.as_str()).collect();
        let embeddings = self.embed_normalized(&texts)?;

        let mut vectors = Vec::with_capacity(docs.len());
        let mut metadata = Vec::with_capacity(docs.len());
        let mut skipped = 0usize;

        for (doc, embedding) in docs.iter().zip(embeddings) {
            match embedding {
                Some(vector) => {
                    vectors.push(vector);
                    metadata.push(ChunkMetadata::from_document(doc));
                }
                None => {
                    log::debug!("Document {} has a degenerate embedding", doc.id);
                    skipped += 1;
                }
            }
        }

        if skipped > 0 {
            log::warn!(
                "Excluded {} documents with zero-norm embeddings (empty or unembeddable text)",
                skipped
            );
        }

        let mut index = FlatIndex::new(self.engine.dimension());
        index.add(&vectors)?;

        let loaded = LoadedIndex::new(index, metadata, self.engine.model_name())?;
        self.store.save(&loaded)?;

        log::info!("Indexed {} chunks", loaded.len());
        Ok(loaded)
    }

    /// Top-k chunk metadata for `query_text`, most similar first
    ///
    /// Returns an empty list when no index has been built yet or `top_k` is 0.
    pub fn query(&self, query_text: &str, top_k: usize) -> Result<Vec<ChunkMetadata>> {
        Ok(self
            .query_scored(query_text, top_k)?
            .into_iter()
            .map(|hit| hit.metadata)
            .collect())
    }

    /// Like `query`, keeping similarity scores
    pub fn query_scored(&self, query_text: &str, top_k: usize) -> Result<Vec<ScoredChunk>> {
        if top_k == 0 {
            return Ok(vec![]);
        }

        match self.store.load()? {
            Some(loaded) => self.search_loaded(&loaded, query_text, top_k),
            None => {
                log::debug!("Query on missing index, returning no results");
                Ok(vec![])
            }
        }
    }

    /// Search an index that is already in memory, e.g. the one `build` returned
    pub fn search_loaded(
        &self,
        loaded: &LoadedIndex,
        query_text: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        if top_k == 0 || loaded.is_empty() {
            return Ok(vec![]);
        }

        let query_vector = match self.embed_normalized(&[query_text])?.pop().flatten() {
            Some(v) => v,
            None => {
                log::debug!("Query text has a degenerate embedding, returning no results");
                return Ok(vec![]);
            }
        };

        if query_vector.len() != loaded.dimension() {
            return Err(RetrievalError::DimensionMismatch {
                expected: loaded.dimension(),
                actual: query_vector.len(),
            });
        }

        let k = top_k.clamp(1, loaded.len());
        let neighbors = match self.search_mode {
            SearchMode::Exact => loaded.index().search(&query_vector, k)?,
            SearchMode::Hnsw => loaded.index().search_hnsw(&query_vector, k)?,
        };

        let metadata = loaded.metadata();
        let mut results = Vec::with_capacity(neighbors.len());
        for neighbor in neighbors {
            match metadata.get(neighbor.position) {
                Some(meta) => results.push(ScoredChunk {
                    metadata: meta.clone(),
                    score: neighbor.score,
                }),
                None => log::warn!(
                    "Search returned position {} outside {} metadata records; skipping",
                    neighbor.position,
                    metadata.len()
                ),
            }
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEncoder;
    use crate::index::l2_norm;

    fn retriever(dir: &std::path::Path) -> Retriever {
        let engine = VectorEngine::with_encoder(Arc::new(HashEncoder::new(256).unwrap()));
        Retriever::new(Arc::new(engine), IndexStore::new(dir))
    }

    fn construction_docs() -> Vec<Document> {
        vec![
            Document::new("1", "concrete mix ratios", "concrete.txt"),
            Document::new("2", "steel rebar spacing", "rebar.txt"),
            Document::new("3", "paint drying time", "paint.txt"),
        ]
    }

    #[test]
    fn test_build_returns_aligned_index() {
        let tmp = tempfile::tempdir().unwrap();
        let r = retriever(tmp.path());
        let loaded = r.build(&construction_docs()).unwrap();

        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.index().len(), 3);
        let ids: Vec<&str> = loaded.metadata().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert!(r.store().exists());
    }

    #[test]
    fn test_built_vectors_are_unit_length() {
        let tmp = tempfile::tempdir().unwrap();
        let loaded = retriever(tmp.path()).build(&construction_docs()).unwrap();
        for (vector, _) in loaded.chunks() {
            assert!((l2_norm(vector) - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_degenerate_documents_are_excluded() {
        let tmp = tempfile::tempdir().unwrap();
        let mut docs = construction_docs();
        docs.insert(1, Document::new("empty", "", "empty.txt"));
        docs.push(Document::new("punct", "?!...", "punct.txt"));

        let loaded = retriever(tmp.path()).build(&docs).unwrap();
        let ids: Vec<&str> = loaded.metadata().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(loaded.index().len(), 3);
    }

    #[test]
    fn test_query_before_build_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let results = retriever(tmp.path()).query("anything", 3).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_query_zero_top_k_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let r = retriever(tmp.path());
        r.build(&construction_docs()).unwrap();
        assert!(r.query("concrete", 0).unwrap().is_empty());
    }

    #[test]
    fn test_query_with_degenerate_text_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let r = retriever(tmp.path());
        r.build(&construction_docs()).unwrap();
        assert!(r.query("", 3).unwrap().is_empty());
    }

    #[test]
    fn test_search_loaded_matches_query() {
        let tmp = tempfile::tempdir().unwrap();
        let r = retriever(tmp.path());
        let loaded = r.build(&construction_docs()).unwrap();

        let in_memory = r.search_loaded(&loaded, "steel rebar spacing", 3).unwrap();
        let from_disk = r.query_scored("steel rebar spacing", 3).unwrap();
        assert_eq!(in_memory, from_disk);
        assert_eq!(in_memory[0].metadata.id, "2");
        assert!((in_memory[0].score - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_hnsw_mode_ranks_self_first() {
        let tmp = tempfile::tempdir().unwrap();
        let r = retriever(tmp.path()).with_search_mode(SearchMode::Hnsw);
        r.build(&construction_docs()).unwrap();
        let results = r.query("paint drying time", 2).unwrap();
        assert_eq!(results[0].id, "3");
    }

    #[test]
    fn test_model_change_is_dimension_mismatch() {
        let tmp = tempfile::tempdir().unwrap();
        retriever(tmp.path()).build(&construction_docs()).unwrap();

        let engine = VectorEngine::with_encoder(Arc::new(HashEncoder::new(64).unwrap()));
        let other = Retriever::new(Arc::new(engine), IndexStore::new(tmp.path()));
        assert!(matches!(
            other.query("concrete", 3),
            Err(RetrievalError::DimensionMismatch {
                expected: 256,
                actual: 64
            })
        ));
    }

    #[test]
    fn test_empty_corpus_builds_empty_index() {
        let tmp = tempfile::tempdir().unwrap();
        let r = retriever(tmp.path());
        let loaded = r.build(&[]).unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded.dimension(), 256);
        assert!(r.query("concrete", 3).unwrap().is_empty());
    }
}
