use docqa_core::error::Error;
use docqa_core::traits::VectorIndex;
use docqa_core::types::{ChunkMetadata, IndexBatch};
use docqa_vector::LanceIndex;
use tempfile::TempDir;

const DIM: usize = 8;

fn unit(axis: usize) -> Vec<f32> {
    let mut v = vec![0.0; DIM];
    v[axis] = 1.0;
    v
}

fn batch(ids: &[&str], axes: &[usize], source: &str) -> IndexBatch {
    IndexBatch::new(
        ids.iter().map(|s| s.to_string()).collect(),
        axes.iter().map(|&a| unit(a)).collect(),
        ids.iter().map(|s| format!("chunk text {s}")).collect(),
        ids.iter().map(|_| ChunkMetadata { source: source.to_string() }).collect(),
    )
    .expect("batch")
}

#[tokio::test]
async fn get_or_create_is_idempotent_and_data_survives_reopen() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("lancedb");

    let index = LanceIndex::open(&path, "documents", DIM).await.expect("open");
    assert_eq!(index.count().await.expect("count"), 0);
    index.add(&batch(&["a", "b", "c"], &[0, 1, 2], "pitch.pdf")).await.expect("add");
    assert_eq!(index.count().await.expect("count"), 3);
    drop(index);

    let reopened = LanceIndex::open(&path, "documents", DIM).await.expect("reopen");
    assert_eq!(reopened.count().await.expect("count"), 3);
    let hits = reopened.query(&unit(1), 1).await.expect("query");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "b");
    assert_eq!(hits[0].source, "pitch.pdf");
    assert_eq!(hits[0].text, "chunk text b");
    assert!(hits[0].distance.abs() < 1e-5);
}

#[tokio::test]
async fn re_adding_same_ids_does_not_duplicate() {
    let tmp = TempDir::new().expect("tmp");
    let index = LanceIndex::open(tmp.path(), "documents", DIM).await.expect("open");
    index.add(&batch(&["a", "b"], &[0, 1], "x.pdf")).await.expect("add");
    index.add(&batch(&["a", "b"], &[0, 1], "x.pdf")).await.expect("re-add");
    assert_eq!(index.count().await.expect("count"), 2);
}

#[tokio::test]
async fn query_returns_at_most_k_in_ascending_distance() {
    let tmp = TempDir::new().expect("tmp");
    let index = LanceIndex::open(tmp.path(), "documents", DIM).await.expect("open");
    index.add(&batch(&["a", "b", "c", "d", "e"], &[0, 1, 2, 3, 4], "x.pdf")).await.expect("add");

    let mut q = unit(2);
    q[3] = 0.5;
    let hits = index.query(&q, 4).await.expect("query");
    assert_eq!(hits.len(), 4);
    assert_eq!(hits[0].id, "c");
    assert_eq!(hits[1].id, "d");
    for pair in hits.windows(2) {
        assert!(pair[0].distance <= pair[1].distance);
    }
}

#[tokio::test]
async fn empty_collection_query_is_empty() {
    let tmp = TempDir::new().expect("tmp");
    let index = LanceIndex::open(tmp.path(), "documents", DIM).await.expect("open");
    assert!(index.query(&unit(0), 4).await.expect("query").is_empty());
}

#[tokio::test]
async fn reset_clears_entries_but_keeps_collection() {
    let tmp = TempDir::new().expect("tmp");
    let index = LanceIndex::open(tmp.path(), "documents", DIM).await.expect("open");
    index.add(&batch(&["a"], &[0], "x.pdf")).await.expect("add");
    index.reset().await.expect("reset");
    assert_eq!(index.count().await.expect("count"), 0);
    index.add(&batch(&["b"], &[1], "y.pdf")).await.expect("add after reset");
    assert_eq!(index.count().await.expect("count"), 1);
}

#[tokio::test]
async fn reopening_with_other_dimension_is_a_config_error() {
    let tmp = TempDir::new().expect("tmp");
    LanceIndex::open(tmp.path(), "documents", DIM).await.expect("open");
    let err = LanceIndex::open(tmp.path(), "documents", DIM * 2).await.err().expect("dimension mismatch");
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::InvalidConfig(_))), "got: {err}");
}
