//! LanceDB-backed [`VectorIndex`].
//!
//! One table per collection with columns `id`, `text`, `source` and a
//! fixed-width `vector`. Writes are `merge_insert` upserts keyed on `id`;
//! queries are exact L2 scans (lancedb reports squared L2 in `_distance`).
use anyhow::{anyhow, Context, Result};
use arrow_array::{Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{DistanceType, Table};
use std::path::Path;
use std::sync::Arc;

use docqa_core::error::Error;
use docqa_core::traits::VectorIndex;
use docqa_core::types::{IndexBatch, RetrievedChunk};

use crate::schema::{
    build_arrow_schema, vector_dim, DISTANCE_COLUMN, ID_COLUMN, SOURCE_COLUMN, TEXT_COLUMN,
};
use crate::table::{ensure_table, open_db};

pub struct LanceIndex {
    table: Table,
    collection: String,
    dim: usize,
}

impl LanceIndex {
    /// Open the collection under `path`, creating the database directory and
    /// an empty table on first use.
    pub async fn open(path: &Path, collection: &str, dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::invalid_config("index dimension must be greater than 0").into());
        }
        std::fs::create_dir_all(path)
            .with_context(|| format!("creating index directory {}", path.display()))?;
        let conn = open_db(path.to_string_lossy().as_ref()).await?;
        let created = ensure_table(&conn, collection, build_arrow_schema(dim)).await?;
        let table = conn.open_table(collection).execute().await?;

        let schema = table.schema().await?;
        match vector_dim(&schema) {
            Some(d) if d == dim => {}
            Some(d) => {
                return Err(Error::InvalidConfig(format!(
                    "collection '{collection}' stores {d}-dim vectors but the embedder produces {dim}"
                ))
                .into())
            }
            None => return Err(Error::Index(format!("collection '{collection}' has no vector column")).into()),
        }
        tracing::debug!(collection, dim, created, path = %path.display(), "opened vector index");
        Ok(Self { table, collection: collection.to_string(), dim })
    }

    fn to_record_batch(&self, batch: &IndexBatch) -> Result<RecordBatch> {
        let vectors = batch
            .embeddings()
            .iter()
            .map(|v| Some(v.iter().map(|&x| Some(x)).collect::<Vec<_>>()));
        let record_batch = RecordBatch::try_new(
            build_arrow_schema(self.dim),
            vec![
                Arc::new(StringArray::from(batch.ids().to_vec())),
                Arc::new(StringArray::from(batch.texts().to_vec())),
                Arc::new(StringArray::from(
                    batch.metadata().iter().map(|m| m.source.clone()).collect::<Vec<_>>(),
                )),
                Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(
                    vectors,
                    self.dim as i32,
                )),
            ],
        )?;
        Ok(record_batch)
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| anyhow!("result batch is missing column '{name}'"))
}

#[async_trait]
impl VectorIndex for LanceIndex {
    async fn add(&self, batch: &IndexBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        if let Some(d) = batch.dim().filter(|d| *d != self.dim) {
            return Err(Error::Index(format!("embedding dimension {d} does not match index dimension {}", self.dim)).into());
        }
        let record_batch = self.to_record_batch(batch)?;
        let schema = record_batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(record_batch)].into_iter(), schema));
        // upsert: existing ids are replaced, new ids inserted
        let mut mi = self.table.merge_insert(&[ID_COLUMN]);
        mi.when_matched_update_all(None).when_not_matched_insert_all();
        mi.execute(reader).await?;
        tracing::debug!(collection = %self.collection, rows = batch.len(), "upserted chunks");
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
        if top_k == 0 || self.count().await? == 0 {
            return Ok(Vec::new());
        }
        let mut stream = self
            .table
            .vector_search(embedding.to_vec())?
            .distance_type(DistanceType::L2)
            .limit(top_k)
            .execute()
            .await?;

        let mut hits = Vec::new();
        while let Some(batch) = stream.try_next().await? {
            let ids = string_column(&batch, ID_COLUMN)?;
            let texts = string_column(&batch, TEXT_COLUMN)?;
            let sources = string_column(&batch, SOURCE_COLUMN)?;
            let distances = batch
                .column_by_name(DISTANCE_COLUMN)
                .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
                .ok_or_else(|| anyhow!("result batch is missing column '{DISTANCE_COLUMN}'"))?;
            for i in 0..batch.num_rows() {
                hits.push(RetrievedChunk {
                    id: ids.value(i).to_string(),
                    text: texts.value(i).to_string(),
                    source: sources.value(i).to_string(),
                    distance: if distances.is_valid(i) { distances.value(i) } else { f32::INFINITY },
                });
            }
        }
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then_with(|| a.id.cmp(&b.id)));
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.table.count_rows(None).await?)
    }

    async fn reset(&self) -> Result<()> {
        self.table.delete("true").await?;
        tracing::info!(collection = %self.collection, "cleared vector index");
        Ok(())
    }
}
