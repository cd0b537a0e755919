//! End-to-end pipeline tests with the mock embedding provider.
//!
//! The mock embeds text as a hashed bag of tokens, so documents sharing
//! vocabulary with the query land closer in the vector space. That makes
//! ranking assertions deterministic without a live model server.

use std::sync::Arc;

use ragvault::chunking::TextChunker;
use ragvault::embeddings::{Embedder, MockEmbeddingProvider};
use ragvault::pipeline::VaultService;
use ragvault::store::{DistanceMetric, SqliteVectorStore};
use ragvault::types::Document;

async fn make_service() -> VaultService {
    let embedder = Embedder::probe(Arc::new(MockEmbeddingProvider::new()))
        .await
        .expect("mock probe cannot fail");
    let store = SqliteVectorStore::open_in_memory(
        "pipeline_test",
        embedder.dimension(),
        DistanceMetric::Cosine,
    )
    .await
    .expect("in-memory store should open");
    let chunker = TextChunker::new(100, 20).expect("valid chunker config");
    VaultService::new(chunker, embedder, store)
}

#[tokio::test]
async fn ingest_then_query_returns_the_relevant_document() {
    let service = make_service().await;

    let documents = vec![
        Document::new(
            "physics.txt",
            "Quantum mechanics describes atomic-scale physics.",
            ".txt",
            49,
        ),
        Document::new(
            "ml.txt",
            "Machine learning is a branch of artificial intelligence.",
            ".txt",
            56,
        ),
    ];

    let stored = service.ingest(&documents).await.expect("ingest succeeds");
    assert_eq!(stored, 2);

    let hits = service
        .query("What is quantum mechanics?", 1, None)
        .await
        .expect("query succeeds");

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].source(), Some("physics.txt"));
    assert_eq!(
        hits[0].text(),
        Some("Quantum mechanics describes atomic-scale physics.")
    );
}

#[tokio::test]
async fn hits_come_back_highest_score_first() {
    let service = make_service().await;
    service
        .ingest(&[
            Document::new(
                "physics.txt",
                "Quantum mechanics describes atomic-scale physics.",
                ".txt",
                49,
            ),
            Document::new(
                "ml.txt",
                "Machine learning is a branch of artificial intelligence.",
                ".txt",
                56,
            ),
        ])
        .await
        .unwrap();

    let hits = service
        .query("What is quantum mechanics?", 5, None)
        .await
        .unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].source(), Some("physics.txt"));
    assert!(hits[0].score > hits[1].score);
}

#[tokio::test]
async fn ingesting_nothing_stores_nothing() {
    let service = make_service().await;

    let stored = service.ingest(&[]).await.expect("empty ingest is fine");
    assert_eq!(stored, 0);

    let stored = service
        .ingest(&[Document::new("blank.txt", "   \n\n  ", ".txt", 8)])
        .await
        .expect("whitespace-only ingest is fine");
    assert_eq!(stored, 0);

    assert_eq!(service.stats().await.unwrap().total_points, 0);
}

#[tokio::test]
async fn long_documents_are_split_and_every_chunk_is_searchable() {
    let service = make_service().await;

    // Well over the 100-char budget, paragraph-separated so the splitter
    // has natural boundaries to work with.
    let long_text = "The moon orbits the earth once every month.\n\n\
                     Tides on earth follow the pull of the moon.\n\n\
                     Eclipses happen when the moon crosses the ecliptic plane.";
    service
        .ingest(&[Document::new(
            "astronomy.txt",
            long_text,
            ".txt",
            long_text.len() as u64,
        )])
        .await
        .unwrap();

    let stats = service.stats().await.unwrap();
    assert!(stats.total_points > 1, "expected multiple chunks");

    let hits = service.query("moon tides", 10, None).await.unwrap();
    assert!(!hits.is_empty());
    for hit in &hits {
        assert_eq!(hit.source(), Some("astronomy.txt"));
        assert!(hit.text().is_some());
    }
}

#[tokio::test]
async fn clear_resets_the_vault() {
    let service = make_service().await;
    service
        .ingest(&[Document::new("doc.txt", "Some indexed content.", ".txt", 21)])
        .await
        .unwrap();
    assert_eq!(service.stats().await.unwrap().total_points, 1);

    service.clear().await.expect("clear succeeds");
    assert_eq!(service.stats().await.unwrap().total_points, 0);

    let hits = service.query("indexed content", 5, None).await.unwrap();
    assert!(hits.is_empty());
}
