//! Subcommand implementations
//!
//! Each command writes its user-facing output to the given writer; logging
//! goes through `tracing` to stderr.

use anyhow::Result;
use serde_json::json;
use std::io::Write;
use std::path::Path;

use sitechat_retrieval::{
    compose_prompt, GenerationParams, IndexStore, RetrievalError, Retriever, DEFAULT_PREAMBLE,
};

use crate::ingest;

/// Where the documents for a build come from
#[derive(Debug, Clone)]
pub enum DocumentSource<'a> {
    Dir(&'a Path),
    JsonLines(&'a Path),
}

/// Ingest documents, build the index and persist it
pub fn build(retriever: &Retriever, source: DocumentSource<'_>, out: &mut dyn Write) -> Result<()> {
    let docs = match source {
        DocumentSource::Dir(dir) => ingest::load_documents_from_dir(dir)?,
        DocumentSource::JsonLines(path) => ingest::load_documents_from_jsonl(path)?,
    };

    let loaded = retriever.build(&docs)?;
    let skipped = docs.len() - loaded.len();

    writeln!(
        out,
        "Indexed {} chunks ({}d) into {}",
        loaded.len(),
        loaded.dimension(),
        retriever.store().dir().display()
    )?;
    if skipped > 0 {
        writeln!(out, "Skipped {skipped} documents with no embeddable text")?;
    }
    Ok(())
}

/// Print the top-k chunks for a question
pub fn query(
    retriever: &Retriever,
    question: &str,
    top_k: usize,
    as_json: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let hits = retriever.query_scored(question, top_k)?;

    if as_json {
        let records: Vec<_> = hits
            .iter()
            .map(|hit| {
                json!({
                    "id": hit.metadata.id,
                    "source": hit.metadata.source,
                    "text_snippet": hit.metadata.text_snippet,
                    "score": hit.score,
                })
            })
            .collect();
        writeln!(out, "{}", serde_json::to_string_pretty(&records)?)?;
        return Ok(());
    }

    if hits.is_empty() {
        writeln!(out, "No results.")?;
        return Ok(());
    }

    for (rank, hit) in hits.iter().enumerate() {
        writeln!(
            out,
            "{}. [{:.3}] {} ({})",
            rank + 1,
            hit.score,
            hit.metadata.source_label(),
            hit.metadata.id
        )?;
        writeln!(out, "   {}", hit.metadata.text_snippet.replace('\n', " "))?;
    }
    Ok(())
}

/// Print the grounded prompt a generation model would receive
pub fn context(
    retriever: &Retriever,
    question: &str,
    top_k: usize,
    as_json: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let hits = retriever.query(question, top_k)?;
    let prompt = compose_prompt(DEFAULT_PREAMBLE, &hits, question);

    if as_json {
        let payload = json!({
            "prompt": prompt,
            "params": GenerationParams::default(),
            "sources": hits.iter().map(|h| h.source_label()).collect::<Vec<_>>(),
        });
        writeln!(out, "{}", serde_json::to_string_pretty(&payload)?)?;
    } else {
        writeln!(out, "{prompt}")?;
    }
    Ok(())
}

/// Report whether an index exists and what it holds
pub fn status(store: &IndexStore, out: &mut dyn Write) -> Result<()> {
    match store.status()? {
        Some(header) => writeln!(
            out,
            "Index loaded: {} chunks ({}d, model {}, built {})",
            header.count,
            header.dimension,
            header.model,
            header.built_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?,
        None => writeln!(
            out,
            "No vector index found in {}. Run `sitechat build --docs data/docs` to index documents.",
            store.dir().display()
        )?,
    }
    Ok(())
}

/// Follow-up advice for errors caused by an unusable on-disk index
pub fn rebuild_hint(err: &anyhow::Error) -> Option<&'static str> {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<RetrievalError>())
        .any(RetrievalError::is_corrupt_index)
        .then_some("The stored index is damaged or incomplete. Run `sitechat build` to rebuild it.")
}
