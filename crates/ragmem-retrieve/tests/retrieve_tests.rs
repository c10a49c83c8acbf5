use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use ragmem_core::error::{Error, Result};
use ragmem_core::types::{Meta, Metric, RetrievedItem};
use ragmem_core::vecmath;
use ragmem_embed::Embedder;
use ragmem_retrieve::Retriever;
use ragmem_vector::VectorIndex;

/// Deterministic bag-of-keywords embedder: each known keyword owns one
/// axis, so texts about the same topic land close together.
struct KeywordProvider;

const KEYWORDS: [&str; 8] =
    ["cat", "dog", "fish", "rust", "python", "ocean", "mountain", "city"];

#[async_trait]
impl ragmem_core::traits::EmbeddingProvider for KeywordProvider {
    fn dimension(&self) -> usize {
        KEYWORDS.len()
    }

    fn model_name(&self) -> &str {
        "keyword-bag"
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                let mut v: Vec<f32> = KEYWORDS
                    .iter()
                    .map(|kw| lower.matches(kw).count() as f32)
                    .collect();
                vecmath::normalize_in_place(&mut v);
                v
            })
            .collect())
    }
}

async fn indexed_retriever(texts: &[(&str, &str)]) -> Retriever {
    let embedder = Arc::new(Embedder::new(Arc::new(KeywordProvider)));
    let mut index = VectorIndex::new(KEYWORDS.len(), Metric::Cosine).expect("index");
    let owned: Vec<String> = texts.iter().map(|(t, _)| t.to_string()).collect();
    let vectors = embedder.embed_batch(&owned).await.expect("embed");
    let metadata = texts
        .iter()
        .map(|(_, source)| {
            let mut m = Meta::new();
            m.insert("source".to_string(), source.to_string());
            m
        })
        .collect();
    index.add(vectors, owned, Some(metadata)).expect("add");
    Retriever::new(embedder, Arc::new(RwLock::new(index)))
}

fn item(text: &str, score: f32, rank: usize) -> RetrievedItem {
    RetrievedItem { text: text.to_string(), score, metadata: Meta::new(), rank }
}

#[tokio::test]
async fn retrieves_topically_closest_chunks_first() {
    let retriever = indexed_retriever(&[
        ("the cat sat near another cat", "pets.txt"),
        ("rust compiles to fast native code", "lang.txt"),
        ("the ocean is deep and the ocean is wide", "nature.txt"),
    ])
    .await;

    let items = retriever.retrieve("tell me about the cat", None, None).await.expect("retrieve");
    assert!(!items.is_empty());
    assert!(items[0].text.contains("cat"));
    assert_eq!(items[0].rank, 0);
    assert_eq!(items[0].metadata.get("source").map(String::as_str), Some("pets.txt"));
}

#[tokio::test]
async fn blank_query_is_an_empty_input_error() {
    let retriever = indexed_retriever(&[("a dog", "a.txt")]).await;
    for query in ["", "   ", "\t\n"] {
        let err = retriever.retrieve(query, None, None).await.expect_err("blank");
        assert!(matches!(err, Error::EmptyInput(_)));
    }
}

#[tokio::test]
async fn empty_index_yields_no_items() {
    let embedder = Arc::new(Embedder::new(Arc::new(KeywordProvider)));
    let index = VectorIndex::new(KEYWORDS.len(), Metric::Cosine).expect("index");
    let retriever = Retriever::new(embedder, Arc::new(RwLock::new(index)));
    let items = retriever.retrieve("cat", None, None).await.expect("retrieve");
    assert!(items.is_empty());
}

#[tokio::test]
async fn cosine_threshold_filters_weak_matches() {
    let retriever = indexed_retriever(&[
        ("cat cat cat", "pets.txt"),
        ("mountain city ocean", "places.txt"),
    ])
    .await;

    let all = retriever.retrieve("cat", Some(2), Some(0.0)).await.expect("retrieve");
    let strong = retriever.retrieve("cat", Some(2), Some(0.9)).await.expect("retrieve");
    assert_eq!(all.len(), 2);
    assert_eq!(strong.len(), 1);
    assert!(strong[0].text.contains("cat"));
}

#[tokio::test]
async fn threshold_survivors_keep_native_ranks() {
    let retriever = indexed_retriever(&[
        ("dog dog dog", "a.txt"),
        ("dog and fish", "b.txt"),
        ("fish fish fish", "c.txt"),
    ])
    .await;

    let items = retriever.retrieve("fish", Some(3), Some(0.5)).await.expect("retrieve");
    assert!(items.len() < 3, "weak dog-only chunk is filtered");
    assert_eq!(items[0].rank, 0, "best match keeps its native rank");
}

#[tokio::test]
async fn multi_query_merges_without_duplicates() {
    let retriever = indexed_retriever(&[
        ("cat cat", "pets.txt"),
        ("dog dog", "dogs.txt"),
        ("cat and dog", "both.txt"),
    ])
    .await;

    let queries = vec!["cat".to_string(), "dog".to_string()];
    let items = retriever.retrieve_multi_query(&queries, Some(3)).await.expect("multi");
    assert!(items.len() <= 3);
    let mut texts: Vec<&str> = items.iter().map(|i| i.text.as_str()).collect();
    let before = texts.len();
    texts.sort_unstable();
    texts.dedup();
    assert_eq!(texts.len(), before, "merged results contain no duplicate texts");
    // Re-ranked from zero in merged order.
    for (i, it) in items.iter().enumerate() {
        assert_eq!(it.rank, i);
    }
    // Sorted best-first for cosine.
    for pair in items.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[tokio::test]
async fn deduplicate_drops_high_overlap_chunks() {
    let retriever = indexed_retriever(&[("anything", "a.txt")]).await;
    let items = vec![
        item("This is a test chunk for deduplication.", 0.9, 0),
        item("This is a test chunk for deduplication!", 0.8, 1),
        item("Something completely different.", 0.7, 2),
    ];
    let kept = retriever.deduplicate(items, 0.8);
    assert_eq!(kept.len(), 2);
    assert_eq!(kept[0].text, "This is a test chunk for deduplication.");
    assert_eq!(kept[1].text, "Something completely different.");
}

#[tokio::test]
async fn deduplicate_keeps_distinct_chunks_intact() {
    let retriever = indexed_retriever(&[("anything", "a.txt")]).await;
    let items = vec![
        item("alpha beta gamma", 0.9, 0),
        item("delta epsilon zeta", 0.8, 1),
    ];
    let kept = retriever.deduplicate(items, 0.8);
    assert_eq!(kept.len(), 2);
}

#[tokio::test]
async fn explain_reports_the_query_embedding_norm() {
    let retriever = indexed_retriever(&[("cat", "a.txt")]).await;
    let explanation = retriever.explain("cat", 5).await.expect("explain");
    assert_eq!(explanation.query, "cat");
    assert!((explanation.embedding_norm - 1.0).abs() < 1e-3);
    assert_eq!(explanation.items.len(), 1);
}
