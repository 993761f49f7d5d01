//! docqa-vector
//!
//! Persistent nearest-neighbour index over chunk embeddings (LanceDB) plus an
//! in-memory index with the same contract.

pub mod memory;
pub mod schema;
pub mod store;
pub mod table;

use anyhow::Result;
use std::sync::Arc;

use docqa_core::config::IndexConfig;
use docqa_core::traits::VectorIndex;

pub use memory::InMemoryIndex;
pub use store::LanceIndex;

/// Get-or-create the configured collection.
pub async fn open_index(cfg: &IndexConfig, dim: usize) -> Result<Arc<dyn VectorIndex>> {
    Ok(Arc::new(LanceIndex::open(&cfg.path, &cfg.collection, dim).await?))
}
