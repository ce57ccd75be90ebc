//! Retrieval configuration
//!
//! Read once at process start from the environment; callers may override
//! individual fields afterwards (the CLI does this for its flags).

use std::path::PathBuf;
use std::str::FromStr;

/// Environment variable naming the embedding model
pub const EMBED_MODEL_ENV: &str = "EMBED_MODEL";
/// Environment variable for the artifact directory
pub const STORE_DIR_ENV: &str = "SITECHAT_STORE_DIR";
/// Environment variable for the downloaded model cache
pub const MODEL_CACHE_ENV: &str = "SITECHAT_MODEL_CACHE";
/// Environment variable selecting exact or approximate search
pub const SEARCH_MODE_ENV: &str = "SITECHAT_SEARCH_MODE";

/// 384-dimensional sentence-transformer model
pub const DEFAULT_EMBED_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
pub const DEFAULT_STORE_DIR: &str = "vector_store";

/// How nearest neighbors are found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// Exact inner product over every vector
    #[default]
    Exact,
    /// Approximate HNSW graph built over the loaded vectors
    Hnsw,
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" | "flat" => Ok(Self::Exact),
            "hnsw" | "approximate" => Ok(Self::Hnsw),
            other => Err(format!("unknown search mode: {other}")),
        }
    }
}

/// Settings shared by the embedder, the index store and the retriever
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Embedding model identifier (fastembed model code, or `hash[:dim]`)
    pub embed_model: String,
    /// Directory holding `index.bin` and `meta.json`
    pub store_dir: PathBuf,
    /// Where downloaded model files are cached (None = `~/.sitechat/models`)
    pub model_cache_dir: Option<PathBuf>,
    /// Nearest-neighbor strategy used by queries
    pub search_mode: SearchMode,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
            model_cache_dir: None,
            search_mode: SearchMode::Exact,
        }
    }
}

impl RetrievalConfig {
    /// Build configuration from process environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(model) = non_empty(EMBED_MODEL_ENV) {
            config.embed_model = model.trim().to_string();
        }

        if let Some(dir) = non_empty(STORE_DIR_ENV) {
            config.store_dir = PathBuf::from(dir);
        }

        if let Some(dir) = non_empty(MODEL_CACHE_ENV) {
            config.model_cache_dir = Some(PathBuf::from(dir));
        }

        if let Some(mode) = non_empty(SEARCH_MODE_ENV) {
            match mode.parse() {
                Ok(mode) => config.search_mode = mode,
                Err(e) => log::warn!("{}; falling back to exact search", e),
            }
        }

        config
    }

    pub fn with_embed_model(mut self, model: impl Into<String>) -> Self {
        self.embed_model = model.into();
        self
    }

    pub fn with_store_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.store_dir = dir.into();
        self
    }

    pub fn with_search_mode(mut self, mode: SearchMode) -> Self {
        self.search_mode = mode;
        self
    }

    /// Resolve the model cache directory
    ///
    /// Priority:
    /// 1. Explicit `model_cache_dir` (from `SITECHAT_MODEL_CACHE`)
    /// 2. User home directory (~/.sitechat/models)
    /// 3. `.sitechat/models` relative to the working directory
    pub fn resolved_model_cache_dir(&self) -> PathBuf {
        if let Some(dir) = &self.model_cache_dir {
            return dir.clone();
        }

        match std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
            Some(home) => PathBuf::from(home).join(".sitechat").join("models"),
            None => PathBuf::from(".sitechat").join("models"),
        }
    }
}
