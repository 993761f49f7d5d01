//! Domain types shared by the ingestion and query paths.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{Error, Result};

pub type ChunkId = String;

/// A source document during ingestion: its file name plus extracted text.
#[derive(Debug, Clone)]
pub struct Document {
    pub name: String,
    pub text: String,
}

impl Document {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self { name: name.into(), text: text.into() }
    }
}

/// A bounded window of a document's words, the unit of embedding and retrieval.
///
/// - `id`: stable identifier derived from `source`, `chunk_index` and `text`
/// - `source`: originating document name
/// - `chunk_index`: position within the parent document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub text: String,
    pub source: String,
    pub chunk_index: usize,
}

impl Chunk {
    pub fn new(source: &str, chunk_index: usize, text: String) -> Self {
        Self { id: chunk_id(source, chunk_index, &text), text, source: source.to_string(), chunk_index }
    }
}

/// Deterministic chunk id: re-ingesting an unchanged document yields the same ids.
pub fn chunk_id(source: &str, chunk_index: usize, text: &str) -> ChunkId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(source.as_bytes());
    hasher.update(&[0]);
    hasher.update(&(chunk_index as u64).to_le_bytes());
    hasher.update(&[0]);
    hasher.update(text.as_bytes());
    let hex = hasher.finalize().to_hex();
    hex.as_str()[..32].to_string()
}

/// Per-entry metadata stored next to the vector. Only the originating file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
}

/// Parallel sequences handed to `VectorIndex::add`.
///
/// Construction checks the preconditions of an index write: all four
/// sequences have the same length and ids are unique within the batch.
#[derive(Debug, Clone, Default)]
pub struct IndexBatch {
    ids: Vec<ChunkId>,
    embeddings: Vec<Vec<f32>>,
    texts: Vec<String>,
    metadata: Vec<ChunkMetadata>,
}

impl IndexBatch {
    pub fn new(
        ids: Vec<ChunkId>,
        embeddings: Vec<Vec<f32>>,
        texts: Vec<String>,
        metadata: Vec<ChunkMetadata>,
    ) -> Result<Self> {
        let n = ids.len();
        if embeddings.len() != n || texts.len() != n || metadata.len() != n {
            return Err(Error::Index(format!(
                "batch length mismatch: ids={} embeddings={} texts={} metadata={}",
                n,
                embeddings.len(),
                texts.len(),
                metadata.len()
            )));
        }
        let mut seen = HashSet::with_capacity(n);
        for id in &ids {
            if !seen.insert(id.as_str()) {
                return Err(Error::Index(format!("duplicate id in batch: {id}")));
            }
        }
        if let Some(first) = embeddings.first() {
            let dim = first.len();
            if let Some(bad) = embeddings.iter().position(|e| e.len() != dim) {
                return Err(Error::Index(format!(
                    "embedding {} has dimension {}, expected {}",
                    bad,
                    embeddings[bad].len(),
                    dim
                )));
            }
        }
        Ok(Self { ids, embeddings, texts, metadata })
    }

    /// Build a batch from chunks and their embeddings (same order).
    pub fn from_chunks(chunks: &[Chunk], embeddings: Vec<Vec<f32>>) -> Result<Self> {
        Self::new(
            chunks.iter().map(|c| c.id.clone()).collect(),
            embeddings,
            chunks.iter().map(|c| c.text.clone()).collect(),
            chunks.iter().map(|c| ChunkMetadata { source: c.source.clone() }).collect(),
        )
    }

    pub fn len(&self) -> usize { self.ids.len() }
    pub fn is_empty(&self) -> bool { self.ids.is_empty() }
    pub fn ids(&self) -> &[ChunkId] { &self.ids }
    pub fn embeddings(&self) -> &[Vec<f32>] { &self.embeddings }
    pub fn texts(&self) -> &[String] { &self.texts }
    pub fn metadata(&self) -> &[ChunkMetadata] { &self.metadata }

    /// Embedding dimension of the batch, `None` when empty.
    pub fn dim(&self) -> Option<usize> {
        self.embeddings.first().map(Vec::len)
    }
}

/// One retrieval hit. `distance` is squared L2; lower is closer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub id: ChunkId,
    pub text: String,
    pub source: String,
    pub distance: f32,
}

/// Input of a generation backend call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_tokens: usize,
    pub stop: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// The model emitted its end-of-sequence token.
    EndOfSequence,
    /// A configured stop sequence appeared in the output.
    StopSequence,
    /// The output token budget was exhausted.
    MaxTokens,
}

/// Output of a generation backend call.
#[derive(Debug, Clone)]
pub struct Generation {
    pub text: String,
    pub tokens_generated: usize,
    pub stop_reason: StopReason,
}
