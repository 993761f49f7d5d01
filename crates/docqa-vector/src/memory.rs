use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use docqa_core::error::Error;
use docqa_core::traits::VectorIndex;
use docqa_core::types::{IndexBatch, RetrievedChunk};

#[derive(Debug, Clone)]
struct Entry {
    text: String,
    source: String,
    vector: Vec<f32>,
}

/// Exact brute-force index held in memory. Same contract as the LanceDB
/// store (upsert by id, squared L2, ascending order) without persistence.
#[derive(Debug, Default)]
pub struct InMemoryIndex {
    dim: usize,
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryIndex {
    pub fn new(dim: usize) -> Self {
        Self { dim, entries: RwLock::new(HashMap::new()) }
    }
}

pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn add(&self, batch: &IndexBatch) -> Result<()> {
        if let Some(d) = batch.dim().filter(|d| *d != self.dim) {
            return Err(Error::Index(format!("embedding dimension {d} does not match index dimension {}", self.dim)).into());
        }
        let mut entries = self.entries.write();
        for (((id, vector), text), meta) in batch
            .ids()
            .iter()
            .zip(batch.embeddings())
            .zip(batch.texts())
            .zip(batch.metadata())
        {
            entries.insert(
                id.clone(),
                Entry { text: text.clone(), source: meta.source.clone(), vector: vector.clone() },
            );
        }
        Ok(())
    }

    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<RetrievedChunk>> {
        if embedding.len() != self.dim {
            return Err(Error::Index(format!(
                "query dimension {} does not match index dimension {}",
                embedding.len(),
                self.dim
            ))
            .into());
        }
        let entries = self.entries.read();
        let mut hits: Vec<RetrievedChunk> = entries
            .iter()
            .map(|(id, e)| RetrievedChunk {
                id: id.clone(),
                text: e.text.clone(),
                source: e.source.clone(),
                distance: squared_l2(embedding, &e.vector),
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then_with(|| a.id.cmp(&b.id)));
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entries.read().len())
    }

    async fn reset(&self) -> Result<()> {
        self.entries.write().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_core::types::ChunkMetadata;

    fn batch(items: &[(&str, [f32; 2])]) -> IndexBatch {
        IndexBatch::new(
            items.iter().map(|(id, _)| id.to_string()).collect(),
            items.iter().map(|(_, v)| v.to_vec()).collect(),
            items.iter().map(|(id, _)| format!("text {id}")).collect(),
            items.iter().map(|_| ChunkMetadata { source: "a.pdf".into() }).collect(),
        )
        .expect("batch")
    }

    #[tokio::test]
    async fn query_orders_by_distance_and_limits() {
        let idx = InMemoryIndex::new(2);
        idx.add(&batch(&[("far", [0.0, 1.0]), ("near", [1.0, 0.0]), ("mid", [0.6, 0.8])])).await.unwrap();
        let hits = idx.query(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.iter().map(|h| h.id.as_str()).collect::<Vec<_>>(), vec!["near", "mid"]);
        assert!(hits[0].distance <= hits[1].distance);
        assert_eq!(hits[0].distance, 0.0);
    }

    #[tokio::test]
    async fn re_adding_an_id_replaces_it() {
        let idx = InMemoryIndex::new(2);
        idx.add(&batch(&[("a", [1.0, 0.0])])).await.unwrap();
        idx.add(&batch(&[("a", [0.0, 1.0])])).await.unwrap();
        assert_eq!(idx.count().await.unwrap(), 1);
        let hits = idx.query(&[0.0, 1.0], 4).await.unwrap();
        assert_eq!(hits[0].distance, 0.0);
    }

    #[tokio::test]
    async fn empty_index_and_reset() {
        let idx = InMemoryIndex::new(2);
        assert!(idx.query(&[1.0, 0.0], 4).await.unwrap().is_empty());
        idx.add(&batch(&[("a", [1.0, 0.0])])).await.unwrap();
        idx.reset().await.unwrap();
        assert_eq!(idx.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn wrong_dimension_is_rejected() {
        let idx = InMemoryIndex::new(3);
        assert!(idx.add(&batch(&[("a", [1.0, 0.0])])).await.is_err());
        assert!(idx.query(&[1.0, 0.0], 1).await.is_err());
    }
}
