//! fastembed sentence-transformer encoder
//!
//! ONNX models (all-MiniLM-L6-v2 and friends) downloaded from HuggingFace on
//! first use into the model cache directory.

use ::fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use parking_lot::Mutex;
use std::path::Path;

use crate::error::{Result, RetrievalError};

use super::encoder::TextEncoder;

/// Texts per ONNX forward pass
const DEFAULT_BATCH_SIZE: usize = 256;

/// fastembed model wrapper
///
/// The ONNX session is held behind a mutex so concurrent callers are
/// serialized around `encode`.
pub struct FastEmbedEncoder {
    model: Mutex<TextEmbedding>,
    name: String,
    dimension: usize,
    batch_size: usize,
}

impl FastEmbedEncoder {
    /// Resolve `model_name` and load it, downloading into `cache_dir` if needed
    ///
    /// Accepts either the fastembed model code (`Qdrant/all-MiniLM-L6-v2-onnx`)
    /// or the sentence-transformers style name (`sentence-transformers/all-MiniLM-L6-v2`,
    /// `all-MiniLM-L6-v2`).
    pub fn load(model_name: &str, cache_dir: &Path) -> Result<Self> {
        let (model, model_code, dimension) = resolve_model(model_name)?;

        std::fs::create_dir_all(cache_dir).map_err(|e| {
            RetrievalError::model_load(format!(
                "Failed to create model cache {}: {}",
                cache_dir.display(),
                e
            ))
        })?;

        log::info!(
            "Loading embedding model {} (cache: {})",
            model_code,
            cache_dir.display()
        );

        let options = InitOptions::new(model)
            .with_cache_dir(cache_dir.to_path_buf())
            .with_show_download_progress(false);

        let model = TextEmbedding::try_new(options).map_err(|e| {
            RetrievalError::model_load(format!("Failed to load {}: {}", model_code, e))
        })?;

        log::info!("Loaded {} ({}d)", model_code, dimension);

        Ok(Self {
            model: Mutex::new(model),
            name: model_name.to_string(),
            dimension,
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }
}

impl TextEncoder for FastEmbedEncoder {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let model = self.model.lock();
        model
            .embed(texts.to_vec(), Some(self.batch_size))
            .map_err(|e| RetrievalError::embedding(format!("Failed to encode texts: {}", e)))
    }
}

/// Look up a supported fastembed model by name
///
/// Exact model-code matches win; otherwise the repository-less, `-onnx`-less
/// short name is compared case-insensitively and the first supported model
/// in fastembed's list order is taken.
fn resolve_model(name: &str) -> Result<(EmbeddingModel, String, usize)> {
    let wanted = name.trim();
    let supported = TextEmbedding::list_supported_models();

    let exact = supported
        .iter()
        .find(|info| info.model_code.eq_ignore_ascii_case(wanted));
    let by_short_name = || {
        let short = short_name(wanted);
        supported
            .iter()
            .find(|info| short_name(&info.model_code) == short)
    };

    match exact.or_else(by_short_name) {
        Some(info) => Ok((info.model.clone(), info.model_code.clone(), info.dim)),
        None => Err(RetrievalError::model_load(format!(
            "Unknown embedding model '{}'. Set EMBED_MODEL to a fastembed model \
             (e.g. sentence-transformers/all-MiniLM-L6-v2) or to 'hash[:dim]'",
            wanted
        ))),
    }
}

fn short_name(model_code: &str) -> String {
    let base = model_code.rsplit('/').next().unwrap_or(model_code);
    let base = base.to_ascii_lowercase();
    base.strip_suffix("-onnx").map(str::to_string).unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("Qdrant/all-MiniLM-L6-v2-onnx"), "all-minilm-l6-v2");
        assert_eq!(
            short_name("sentence-transformers/all-MiniLM-L6-v2"),
            "all-minilm-l6-v2"
        );
        assert_eq!(short_name("bge-small-en-v1.5"), "bge-small-en-v1.5");
    }

    #[test]
    fn test_resolve_default_model() {
        let (_, code, dim) = resolve_model(crate::config::DEFAULT_EMBED_MODEL).unwrap();
        assert_eq!(short_name(&code), "all-minilm-l6-v2");
        assert_eq!(dim, 384);
    }

    #[test]
    fn test_unknown_model_is_model_load_error() {
        let tmp = tempfile::tempdir().unwrap();
        let result = FastEmbedEncoder::load("paraphrase-MiniLM-L3-v2", tmp.path());
        match result {
            Err(RetrievalError::ModelLoad(msg)) => assert!(msg.contains("paraphrase-MiniLM-L3-v2")),
            Err(other) => panic!("expected ModelLoad, got {other:?}"),
            Ok(_) => panic!("expected ModelLoad, got a model"),
        }
    }
}
