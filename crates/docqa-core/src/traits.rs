use async_trait::async_trait;

use crate::types::{Generation, GenerationRequest, IndexBatch, RetrievedChunk};

/// Maps text to fixed-dimension dense vectors. Implementations are
/// deterministic and hold no mutable state beyond a loaded model.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed_one(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector"))
    }
}

/// Persistent nearest-neighbour store of chunk embeddings.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert entries; an id that already exists is replaced.
    async fn add(&self, batch: &IndexBatch) -> anyhow::Result<()>;
    /// Up to `top_k` entries ordered by ascending distance. Empty on an empty index.
    async fn query(&self, embedding: &[f32], top_k: usize) -> anyhow::Result<Vec<RetrievedChunk>>;
    async fn count(&self) -> anyhow::Result<usize>;
    /// Remove every entry while keeping the collection.
    async fn reset(&self) -> anyhow::Result<()>;
}

/// A local language model invoked synchronously.
pub trait Generator: Send + Sync {
    fn generate(&self, request: &GenerationRequest) -> anyhow::Result<Generation>;
}
