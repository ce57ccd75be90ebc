//! On-disk index store
//!
//! Two artifacts live in the store directory:
//! - `index.bin`: bincode-encoded header plus row-major f32 vectors
//! - `meta.json`: JSON array of chunk metadata, one record per vector
//!
//! Both are rewritten in full on every save. Each file is written to a
//! sibling `.tmp` file and renamed into place, so a reader never sees a
//! half-written artifact. The index header carries an FNV-1a digest of the
//! metadata bytes; a `meta.json` from a different build is rejected on load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::RetrievalConfig;
use crate::document::ChunkMetadata;
use crate::embedding::fnv1a;
use crate::error::{Result, RetrievalError};
use crate::index::FlatIndex;

pub const INDEX_FILE: &str = "index.bin";
pub const METADATA_FILE: &str = "meta.json";

const INDEX_MAGIC: [u8; 4] = *b"SCIX";
const FORMAT_VERSION: u32 = 2;

/// Header stored at the start of `index.bin`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexHeader {
    magic: [u8; 4],
    version: u32,
    /// Vector dimension
    pub dimension: usize,
    /// Number of vectors
    pub count: usize,
    /// Embedding model the vectors were produced with
    pub model: String,
    /// When the index was built
    pub built_at: DateTime<Utc>,
    /// FNV-1a digest of the `meta.json` bytes written with this index
    metadata_digest: u64,
}

impl IndexHeader {
    fn new(dimension: usize, count: usize, model: String) -> Self {
        Self {
            magic: INDEX_MAGIC,
            version: FORMAT_VERSION,
            dimension,
            count,
            model,
            built_at: Utc::now(),
            metadata_digest: 0,
        }
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if self.magic != INDEX_MAGIC {
            return Err(RetrievalError::corrupt(path, "not a sitechat index file"));
        }
        if self.version != FORMAT_VERSION {
            return Err(RetrievalError::corrupt(
                path,
                format!("unsupported index format version {}", self.version),
            ));
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct IndexFileRef<'a> {
    header: &'a IndexHeader,
    vectors: &'a [f32],
}

#[derive(Deserialize)]
struct IndexFile {
    header: IndexHeader,
    vectors: Vec<f32>,
}

/// Vector index paired with its positionally aligned metadata
///
/// Construction checks that there is exactly one metadata record per vector,
/// so position `i` in the index always refers to `metadata()[i]`.
#[derive(Debug, Clone)]
pub struct LoadedIndex {
    header: IndexHeader,
    index: FlatIndex,
    metadata: Vec<ChunkMetadata>,
}

impl LoadedIndex {
    /// Pair a freshly built index with its metadata
    pub fn new(
        index: FlatIndex,
        metadata: Vec<ChunkMetadata>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let header = IndexHeader::new(index.dimension(), index.len(), model.into());
        Self::from_parts(header, index, metadata)
    }

    fn from_parts(
        header: IndexHeader,
        index: FlatIndex,
        metadata: Vec<ChunkMetadata>,
    ) -> Result<Self> {
        if index.len() != metadata.len() {
            return Err(RetrievalError::IndexMetadataMismatch {
                vectors: index.len(),
                metadata: metadata.len(),
            });
        }
        Ok(Self {
            header,
            index,
            metadata,
        })
    }

    pub fn header(&self) -> &IndexHeader {
        &self.header
    }

    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    pub fn metadata(&self) -> &[ChunkMetadata] {
        &self.metadata
    }

    /// Number of indexed chunks
    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    /// Vectors with their metadata, in index order
    pub fn chunks(&self) -> impl Iterator<Item = (&[f32], &ChunkMetadata)> {
        self.index.iter().zip(self.metadata.iter())
    }
}

/// Reads and writes the index artifacts in one directory
#[derive(Debug, Clone)]
pub struct IndexStore {
    dir: PathBuf,
}

impl IndexStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self::new(config.store_dir.clone())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    /// Whether both artifacts are present
    pub fn exists(&self) -> bool {
        self.index_path().exists() && self.metadata_path().exists()
    }

    /// Persist index and metadata, replacing any previous pair
    pub fn save(&self, loaded: &LoadedIndex) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let metadata_bytes = serde_json::to_vec_pretty(&loaded.metadata)?;
        let header = IndexHeader {
            metadata_digest: fnv1a(&metadata_bytes),
            ..loaded.header.clone()
        };
        let index_bytes = bincode::serialize(&IndexFileRef {
            header: &header,
            vectors: loaded.index.raw(),
        })?;

        write_atomic(&self.index_path(), &index_bytes)?;
        write_atomic(&self.metadata_path(), &metadata_bytes)?;

        log::info!(
            "Saved index with {} chunks ({}d) to {}",
            loaded.len(),
            loaded.dimension(),
            self.dir.display()
        );
        Ok(())
    }

    /// Load both artifacts
    ///
    /// Returns `Ok(None)` when either artifact is missing (nothing built yet).
    /// Unparsable artifacts fail with `CorruptIndex`; a vector count that
    /// disagrees with the metadata count fails with `IndexMetadataMismatch`.
    pub fn load(&self) -> Result<Option<LoadedIndex>> {
        if !self.exists() {
            log::debug!("No index found in {}", self.dir.display());
            return Ok(None);
        }

        let index_path = self.index_path();
        let bytes = fs::read(&index_path)?;
        let file: IndexFile = bincode::deserialize(&bytes)
            .map_err(|e| RetrievalError::corrupt(&index_path, e.to_string()))?;
        file.header.validate(&index_path)?;

        let index = FlatIndex::from_raw(file.header.dimension, file.vectors)
            .map_err(|reason| RetrievalError::corrupt(&index_path, reason))?;
        if index.len() != file.header.count {
            return Err(RetrievalError::corrupt(
                &index_path,
                format!(
                    "header declares {} vectors, found {}",
                    file.header.count,
                    index.len()
                ),
            ));
        }

        let metadata_path = self.metadata_path();
        let bytes = fs::read(&metadata_path)?;
        let metadata: Vec<ChunkMetadata> = serde_json::from_slice(&bytes)
            .map_err(|e| RetrievalError::corrupt(&metadata_path, e.to_string()))?;

        let digest = fnv1a(&bytes);
        let expected_digest = file.header.metadata_digest;

        let loaded = LoadedIndex::from_parts(file.header, index, metadata)?;
        if digest != expected_digest {
            return Err(RetrievalError::corrupt(
                &metadata_path,
                "metadata does not belong to this index (rebuilt while reading?)",
            ));
        }
        log::debug!(
            "Loaded index with {} chunks ({}d)",
            loaded.len(),
            loaded.dimension()
        );
        Ok(Some(loaded))
    }

    /// Header of the stored index, for status displays
    ///
    /// Both artifacts are fully loaded and checked against each other, so a
    /// store that `load` would reject never reports as healthy here.
    pub fn status(&self) -> Result<Option<IndexHeader>> {
        Ok(self.load()?.map(|loaded| loaded.header))
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| RetrievalError::invalid_path(path.display().to_string()))?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let written = File::create(&tmp_path).and_then(|mut file| {
        file.write_all(bytes)?;
        file.sync_all()
    });
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    fs::rename(&tmp_path, path)?;
    Ok(())
}
