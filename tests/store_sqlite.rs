//! Integration tests for the sqlite-vec backed vector store.
//!
//! Everything here runs against in-memory databases (or a tempdir for the
//! persistence test), so the suite is hermetic and CI-friendly.

use ragvault::chunking::Chunk;
use ragvault::store::{DistanceMetric, SqliteVectorStore};
use ragvault::types::{MetaValue, Metadata, VaultError};

const DIM: usize = 4;

async fn open_store(metric: DistanceMetric) -> SqliteVectorStore {
    SqliteVectorStore::open_in_memory("test_points", DIM, metric)
        .await
        .expect("in-memory store should open")
}

fn chunk_with_vector(text: &str, vector: Vec<f32>) -> Chunk {
    let mut meta = Metadata::new();
    meta.insert("source".to_string(), MetaValue::from("test.txt"));
    Chunk::new(text, 0, 1)
        .with_metadata(meta)
        .with_embedding(vector)
}

#[tokio::test]
async fn upsert_increases_point_count() {
    let store = open_store(DistanceMetric::Cosine).await;

    let written = store
        .upsert(vec![
            chunk_with_vector("alpha", vec![1.0, 0.0, 0.0, 0.0]),
            chunk_with_vector("beta", vec![0.0, 1.0, 0.0, 0.0]),
            chunk_with_vector("gamma", vec![0.0, 0.0, 1.0, 0.0]),
        ])
        .await
        .expect("upsert should succeed");

    assert_eq!(written, 3);
    let stats = store.stats().await.expect("stats should succeed");
    assert_eq!(stats.total_points, 3);
    assert_eq!(stats.indexed_points, 3);
    assert_eq!(stats.status, "ready");
}

#[tokio::test]
async fn chunks_without_embeddings_are_skipped_not_fatal() {
    let store = open_store(DistanceMetric::Cosine).await;

    let written = store
        .upsert(vec![
            chunk_with_vector("embedded", vec![1.0, 0.0, 0.0, 0.0]),
            Chunk::new("never embedded", 1, 2),
        ])
        .await
        .expect("batch with a missing embedding should still store the rest");

    assert_eq!(written, 1);
    assert_eq!(store.stats().await.unwrap().total_points, 1);
}

#[tokio::test]
async fn search_on_empty_collection_returns_no_hits() {
    let store = open_store(DistanceMetric::Cosine).await;

    let hits = store
        .search(&[1.0, 0.0, 0.0, 0.0], 10, None)
        .await
        .expect("search on an empty collection is not an error");

    assert!(hits.is_empty());
}

#[tokio::test]
async fn cosine_search_ranks_closest_vector_first() {
    let store = open_store(DistanceMetric::Cosine).await;
    store
        .upsert(vec![
            chunk_with_vector("east", vec![1.0, 0.0, 0.0, 0.0]),
            chunk_with_vector("north", vec![0.0, 1.0, 0.0, 0.0]),
            chunk_with_vector("northeast", vec![1.0, 1.0, 0.0, 0.0]),
        ])
        .await
        .unwrap();

    let hits = store
        .search(&[0.9, 0.1, 0.0, 0.0], 3, None)
        .await
        .unwrap();

    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].text(), Some("east"));
    assert!(hits[0].score > hits[1].score);
    assert!(hits[1].score >= hits[2].score);
    assert_eq!(hits[2].text(), Some("north"));
}

#[tokio::test]
async fn dot_metric_ranks_by_inner_product() {
    let store = open_store(DistanceMetric::Dot).await;
    store
        .upsert(vec![
            chunk_with_vector("short", vec![0.5, 0.0, 0.0, 0.0]),
            chunk_with_vector("long", vec![2.0, 0.0, 0.0, 0.0]),
        ])
        .await
        .unwrap();

    let hits = store.search(&[1.0, 0.0, 0.0, 0.0], 2, None).await.unwrap();

    // Inner product rewards magnitude, unlike cosine.
    assert_eq!(hits[0].text(), Some("long"));
    assert!((hits[0].score - 2.0).abs() < 1e-6);
    assert!((hits[1].score - 0.5).abs() < 1e-6);
}

#[tokio::test]
async fn euclidean_scores_are_negated_distances() {
    let store = open_store(DistanceMetric::Euclidean).await;
    store
        .upsert(vec![
            chunk_with_vector("near", vec![1.0, 0.0, 0.0, 0.0]),
            chunk_with_vector("far", vec![5.0, 0.0, 0.0, 0.0]),
        ])
        .await
        .unwrap();

    let hits = store.search(&[1.0, 0.0, 0.0, 0.0], 2, None).await.unwrap();

    // Higher score still means better match: -0.0 beats -4.0.
    assert_eq!(hits[0].text(), Some("near"));
    assert!(hits[0].score > hits[1].score);
}

#[tokio::test]
async fn threshold_drops_low_scoring_hits() {
    let store = open_store(DistanceMetric::Cosine).await;
    store
        .upsert(vec![
            chunk_with_vector("aligned", vec![1.0, 0.0, 0.0, 0.0]),
            chunk_with_vector("orthogonal", vec![0.0, 1.0, 0.0, 0.0]),
        ])
        .await
        .unwrap();

    let query = [1.0, 0.0, 0.0, 0.0];
    let hits = store.search(&query, 10, Some(0.5)).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].text(), Some("aligned"));

    // Cosine similarity never exceeds 1.0, so this filters everything.
    let hits = store.search(&query, 10, Some(1.1)).await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn limit_zero_returns_empty() {
    let store = open_store(DistanceMetric::Cosine).await;
    store
        .upsert(vec![chunk_with_vector("only", vec![1.0, 0.0, 0.0, 0.0])])
        .await
        .unwrap();

    let hits = store.search(&[1.0, 0.0, 0.0, 0.0], 0, None).await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn wrong_dimension_is_rejected_without_side_effects() {
    let store = open_store(DistanceMetric::Cosine).await;
    store
        .upsert(vec![chunk_with_vector("kept", vec![1.0, 0.0, 0.0, 0.0])])
        .await
        .unwrap();

    let err = store
        .upsert(vec![
            chunk_with_vector("wrong", vec![1.0, 0.0]),
            chunk_with_vector("also dropped", vec![0.0, 1.0, 0.0, 0.0]),
        ])
        .await
        .expect_err("mismatched vector length must fail the whole batch");
    assert!(matches!(
        err,
        VaultError::DimensionMismatch {
            expected: 4,
            actual: 2,
            ..
        }
    ));
    // Nothing from the failed batch landed.
    assert_eq!(store.stats().await.unwrap().total_points, 1);

    let err = store
        .search(&[1.0, 0.0], 5, None)
        .await
        .expect_err("query vector length must match the collection");
    assert!(matches!(err, VaultError::DimensionMismatch { .. }));
}

#[tokio::test]
async fn clear_empties_but_keeps_the_collection_usable() {
    let store = open_store(DistanceMetric::Cosine).await;
    store
        .upsert(vec![chunk_with_vector("gone soon", vec![1.0, 0.0, 0.0, 0.0])])
        .await
        .unwrap();

    store.clear().await.expect("clear should succeed");

    assert!(store.exists().await.unwrap());
    assert_eq!(store.stats().await.unwrap().total_points, 0);

    // The cleared collection accepts new points with the same schema.
    let written = store
        .upsert(vec![chunk_with_vector("fresh", vec![0.0, 1.0, 0.0, 0.0])])
        .await
        .unwrap();
    assert_eq!(written, 1);
}

#[tokio::test]
async fn reingesting_the_same_chunk_stores_a_new_point() {
    let store = open_store(DistanceMetric::Cosine).await;
    let chunk = chunk_with_vector("same text", vec![1.0, 0.0, 0.0, 0.0]);

    store.upsert(vec![chunk.clone()]).await.unwrap();
    store.upsert(vec![chunk]).await.unwrap();

    // Point ids are freshly generated per upsert, so no dedup happens.
    assert_eq!(store.stats().await.unwrap().total_points, 2);
}

#[tokio::test]
async fn extension_registration_is_shared_across_stores() {
    // Opening several stores in one process must reuse the single cached
    // sqlite-vec registration; both handles stay fully functional.
    let first = open_store(DistanceMetric::Cosine).await;
    let second = open_store(DistanceMetric::Euclidean).await;

    first
        .upsert(vec![chunk_with_vector("one", vec![1.0, 0.0, 0.0, 0.0])])
        .await
        .unwrap();
    second
        .upsert(vec![chunk_with_vector("two", vec![0.0, 1.0, 0.0, 0.0])])
        .await
        .unwrap();

    assert_eq!(
        first
            .search(&[1.0, 0.0, 0.0, 0.0], 1, None)
            .await
            .unwrap()
            .len(),
        1
    );
    assert_eq!(
        second
            .search(&[0.0, 1.0, 0.0, 0.0], 1, None)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn points_survive_reopening_the_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("vault.sqlite");

    let store = SqliteVectorStore::open(&db_path, "persisted", DIM, DistanceMetric::Cosine)
        .await
        .unwrap();
    store
        .upsert(vec![chunk_with_vector("durable", vec![1.0, 0.0, 0.0, 0.0])])
        .await
        .unwrap();
    store.close().await.unwrap();

    let reopened = SqliteVectorStore::open(&db_path, "persisted", DIM, DistanceMetric::Cosine)
        .await
        .unwrap();
    let hits = reopened
        .search(&[1.0, 0.0, 0.0, 0.0], 1, None)
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].text(), Some("durable"));
    assert_eq!(hits[0].source(), Some("test.txt"));
}
