//! Document ingestion for index builds
//!
//! One document per text file, or one JSON `Document` per line.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use sitechat_retrieval::Document;

/// File patterns picked up under the docs directory
pub const DOC_PATTERNS: &[&str] = &["**/*.txt", "**/*.md"];

/// Read every matching text file under `dir`, sorted by path
///
/// `id` is the path relative to `dir` (forward slashes), `source` the file name.
pub fn load_documents_from_dir(dir: &Path) -> Result<Vec<Document>> {
    if !dir.is_dir() {
        bail!("Docs directory not found: {}", dir.display());
    }

    let base = glob::Pattern::escape(&dir.to_string_lossy());
    let mut paths: Vec<PathBuf> = Vec::new();
    for pattern in DOC_PATTERNS {
        let full = format!("{}/{}", base.trim_end_matches('/'), pattern);
        for entry in glob::glob(&full).with_context(|| format!("Invalid pattern {full}"))? {
            let path = entry.context("Failed to read docs directory entry")?;
            if path.is_file() {
                paths.push(path);
            }
        }
    }
    paths.sort();
    paths.dedup();

    let mut docs = Vec::with_capacity(paths.len());
    for path in paths {
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let relative = path.strip_prefix(dir).unwrap_or(&path);
        let id = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        docs.push(Document::new(id, text, source));
    }

    tracing::info!("Read {} documents from {}", docs.len(), dir.display());
    Ok(docs)
}

/// Read JSON-lines `Document` records; blank lines are ignored
pub fn load_documents_from_jsonl(path: &Path) -> Result<Vec<Document>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let mut docs = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let doc: Document = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: invalid document", path.display(), line_no + 1))?;
        docs.push(doc);
    }

    tracing::info!("Read {} documents from {}", docs.len(), path.display());
    Ok(docs)
}
