//! Sentence embeddings for chunks and questions.
//!
//! [`load_embedder`] picks the backend from configuration: the MiniLM BERT
//! model on candle, or the hashed bag-of-words embedder. Setting
//! `APP_USE_FAKE_EMBEDDINGS=1` forces the hash backend regardless of config.

use anyhow::Result;
use std::sync::Arc;

use docqa_core::config::{EmbeddingBackend, EmbeddingConfig};
use docqa_core::traits::Embedder;

mod bert;
mod device;
mod hash;
mod pool;
mod tokenize;

pub use bert::MiniLmEmbedder;
pub use device::select_device;
pub use hash::HashEmbedder;
pub use pool::masked_mean_l2;
pub use tokenize::tokenize_batch;

/// True when `APP_USE_FAKE_EMBEDDINGS` is `1` or `true`.
pub fn use_fake_embeddings() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

pub fn load_embedder(cfg: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    if use_fake_embeddings() || cfg.backend == EmbeddingBackend::Hash {
        tracing::info!(dim = cfg.dimension, "using hash embedder");
        return Ok(Arc::new(HashEmbedder::new(cfg.dimension)));
    }
    Ok(Arc::new(MiniLmEmbedder::load(cfg)?))
}
