//! PDF directory ingestion: extract, chunk, embed, upsert.
//!
//! A document that fails at any stage is logged, recorded in the report and
//! skipped; the rest of the directory is still ingested.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use docqa_core::chunker::Chunker;
use docqa_core::error::Error;
use docqa_core::traits::{Embedder, VectorIndex};
use docqa_core::types::{Document, IndexBatch};

#[derive(Debug, Clone, Serialize)]
pub struct IngestFailure {
    pub document: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    /// Documents whose chunks reached the index.
    pub documents: usize,
    pub chunks: usize,
    /// Documents that yielded no text.
    pub empty: Vec<String>,
    pub failures: Vec<IngestFailure>,
}

/// Top-level `.pdf` files of `dir` (extension matched case-insensitively), sorted.
pub fn list_pdfs(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::NotFound(format!("PDF directory {}", dir.display())).into());
    }
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().map(|x| x.eq_ignore_ascii_case("pdf")).unwrap_or(false))
        .collect();
    files.sort();
    Ok(files)
}

/// Page texts joined with a newline.
///
/// Only a document that cannot be loaded or decrypted is an error. A page
/// that fails to extract contributes empty text.
pub fn extract_pdf_text(path: &Path) -> std::result::Result<String, Error> {
    let document = file_name(path);
    let fail = |reason: String| Error::Ingestion { document: document.clone(), reason };

    // lopdf panics on some malformed files
    let mut doc = catch_unwind(AssertUnwindSafe(|| pdf_extract::Document::load(path)))
        .map_err(|_| fail("PDF parser panicked".to_string()))?
        .map_err(|e| fail(e.to_string()))?;
    if doc.is_encrypted() {
        doc.decrypt("").map_err(|e| fail(format!("encrypted: {e}")))?;
    }

    let pages: Vec<String> = doc
        .get_pages()
        .into_keys()
        .map(|page| {
            extract_page(&doc, page).unwrap_or_else(|reason| {
                tracing::warn!(document = %document, page, error = %reason, "unreadable page");
                String::new()
            })
        })
        .collect();
    Ok(pages.join("\n"))
}

fn extract_page(doc: &pdf_extract::Document, page: u32) -> std::result::Result<String, String> {
    let mut text = String::new();
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let mut output = pdf_extract::PlainTextOutput::new(&mut text);
        pdf_extract::output_doc_page(doc, &mut output, page)
    }));
    match outcome {
        Ok(Ok(())) => Ok(text),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err("PDF parser panicked".to_string()),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

pub struct Ingestor {
    chunker: Chunker,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    show_progress: bool,
}

impl Ingestor {
    pub fn new(chunker: Chunker, embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { chunker, embedder, index, show_progress: false }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Chunk, embed and upsert one document. Returns the number of chunks written.
    pub async fn ingest_document(&self, doc: &Document) -> Result<usize> {
        let chunks = self.chunker.chunk_document(doc);
        if chunks.is_empty() {
            return Ok(0);
        }
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embedder = Arc::clone(&self.embedder);
        let embeddings = tokio::task::spawn_blocking(move || embedder.embed_batch(&texts))
            .await?
            .map_err(|e| Error::Embedding(format!("{e:#}")))?;
        if embeddings.len() != chunks.len() {
            return Err(Error::Embedding(format!(
                "embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            ))
            .into());
        }
        let batch = IndexBatch::from_chunks(&chunks, embeddings)?;
        self.index.add(&batch).await?;
        tracing::debug!(document = %doc.name, chunks = batch.len(), "indexed document");
        Ok(batch.len())
    }

    pub async fn ingest_file(&self, path: &Path) -> Result<usize> {
        let owned = path.to_path_buf();
        let text = tokio::task::spawn_blocking(move || extract_pdf_text(&owned)).await??;
        self.ingest_document(&Document::new(file_name(path), text)).await
    }

    pub async fn ingest_dir(&self, dir: &Path) -> Result<IngestReport> {
        let files = list_pdfs(dir)?;
        let mut report = IngestReport::default();
        if files.is_empty() {
            tracing::warn!(dir = %dir.display(), "no PDF files found");
            return Ok(report);
        }
        tracing::info!(dir = %dir.display(), files = files.len(), "ingesting PDFs");

        let pb = if self.show_progress { ProgressBar::new(files.len() as u64) } else { ProgressBar::hidden() };
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }

        for path in &files {
            let name = file_name(path);
            pb.set_message(name.clone());
            match self.ingest_file(path).await {
                Ok(0) => {
                    tracing::warn!(document = %name, "no extractable text");
                    report.empty.push(name);
                }
                Ok(n) => {
                    report.documents += 1;
                    report.chunks += n;
                }
                Err(e) => {
                    let reason = match e.downcast_ref::<Error>() {
                        Some(Error::Ingestion { reason, .. }) => reason.clone(),
                        _ => format!("{e:#}"),
                    };
                    tracing::warn!(document = %name, error = %reason, "skipping document");
                    report.failures.push(IngestFailure { document: name, reason });
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();
        tracing::info!(
            documents = report.documents,
            chunks = report.chunks,
            failures = report.failures.len(),
            "ingestion finished"
        );
        Ok(report)
    }
}
