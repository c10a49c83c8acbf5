use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use ragmem_core::error::{Error, Result};
use ragmem_core::retry::RetryPolicy;
use ragmem_core::traits::EmbeddingProvider;
use ragmem_core::vecmath;
use ragmem_embed::{Embedder, HashedEmbedder};

/// Counts provider calls and records the largest batch it was handed.
struct CountingProvider {
    inner: HashedEmbedder,
    calls: AtomicUsize,
    max_batch: AtomicUsize,
}

impl CountingProvider {
    fn new(dimension: usize) -> Self {
        Self {
            inner: HashedEmbedder::new(dimension),
            calls: AtomicUsize::new(0),
            max_batch: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for CountingProvider {
    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn model_name(&self) -> &str {
        "counting"
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.max_batch.fetch_max(texts.len(), Ordering::SeqCst);
        self.inner.embed_batch(texts).await
    }
}

/// Fails with a retryable provider error until `failures` is exhausted.
struct FlakyProvider {
    inner: HashedEmbedder,
    remaining_failures: AtomicUsize,
    calls: AtomicUsize,
}

#[async_trait]
impl EmbeddingProvider for FlakyProvider {
    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn model_name(&self) -> &str {
        "flaky"
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(Error::Provider("transient backend failure".to_string()));
        }
        self.inner.embed_batch(texts).await
    }
}

#[tokio::test]
async fn identical_text_embeds_bit_identically() {
    let embedder = Embedder::new(Arc::new(HashedEmbedder::new(64)));
    let a = embedder.embed_text("the quick brown fox").await.expect("embed");
    let b = embedder.embed_text("the quick brown fox").await.expect("embed");
    assert_eq!(a, b, "repeated embeddings must be bit-identical");
    assert_eq!(a.len(), 64);
}

#[tokio::test]
async fn blank_text_embeds_to_the_zero_vector() {
    let embedder = Embedder::new(Arc::new(HashedEmbedder::new(16)));
    for text in ["", "   ", "\n\t"] {
        let v = embedder.embed_text(text).await.expect("embed");
        assert_eq!(v, vec![0.0; 16]);
    }
}

#[tokio::test]
async fn batch_results_match_single_text_results() {
    let embedder = Embedder::new(Arc::new(HashedEmbedder::new(32)));
    let texts = vec![
        "alpha bravo".to_string(),
        "".to_string(),
        "charlie delta echo".to_string(),
    ];
    let batch = embedder.embed_batch(&texts).await.expect("batch");
    assert_eq!(batch.len(), 3);
    for (text, from_batch) in texts.iter().zip(&batch) {
        let single = embedder.embed_text(text).await.expect("single");
        assert_eq!(&single, from_batch);
    }
}

#[tokio::test]
async fn single_text_results_are_cached() {
    let provider = Arc::new(CountingProvider::new(16));
    let embedder = Embedder::new(provider.clone());
    for _ in 0..5 {
        embedder.embed_text("cached text").await.expect("embed");
    }
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1, "one provider call for repeated text");
}

#[tokio::test]
async fn cache_is_bounded_by_capacity() {
    let provider = Arc::new(CountingProvider::new(8));
    let embedder = Embedder::with_capacity(provider.clone(), 2, 32);
    embedder.embed_text("one").await.expect("embed");
    embedder.embed_text("two").await.expect("embed");
    embedder.embed_text("three").await.expect("embed"); // evicts "one"
    embedder.embed_text("one").await.expect("embed");
    assert_eq!(provider.calls.load(Ordering::SeqCst), 4, "evicted entry re-embeds");
}

#[tokio::test]
async fn batches_are_split_into_bounded_sub_batches() {
    let provider = Arc::new(CountingProvider::new(8));
    let embedder = Embedder::with_capacity(provider.clone(), 16, 2);
    let texts: Vec<String> = (0..5).map(|i| format!("text {i}")).collect();
    embedder.embed_batch(&texts).await.expect("batch");
    assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    assert!(provider.max_batch.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn retries_transient_provider_failures() {
    let provider = Arc::new(FlakyProvider {
        inner: HashedEmbedder::new(8),
        remaining_failures: AtomicUsize::new(2),
        calls: AtomicUsize::new(0),
    });
    let embedder = Embedder::new(provider.clone()).with_retry(RetryPolicy {
        max_retries: 3,
        base_backoff_ms: 1,
        max_backoff_ms: 5,
    });
    let v = embedder.embed_text("eventually works").await.expect("recovers");
    assert_eq!(v.len(), 8);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn exhausted_retries_surface_the_provider_error() {
    let provider = Arc::new(FlakyProvider {
        inner: HashedEmbedder::new(8),
        remaining_failures: AtomicUsize::new(100),
        calls: AtomicUsize::new(0),
    });
    let embedder = Embedder::new(provider.clone()).with_retry(RetryPolicy {
        max_retries: 1,
        base_backoff_ms: 1,
        max_backoff_ms: 5,
    });
    let err = embedder.embed_text("never works").await.expect_err("surfaces");
    assert!(matches!(err, Error::Provider(_)));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 2, "initial attempt plus one retry");
}

#[test]
fn normalize_produces_unit_vectors_and_keeps_zero_vectors() {
    let mut vectors = vec![vec![3.0, 4.0], vec![0.0, 0.0]];
    Embedder::normalize(&mut vectors);
    assert!((vecmath::l2_norm(&vectors[0]) - 1.0).abs() < 1e-6);
    assert_eq!(vectors[1], vec![0.0, 0.0]);
}

#[tokio::test]
async fn hashed_embedder_is_normalized() {
    let embedder = Embedder::new(Arc::new(HashedEmbedder::new(128)));
    let v = embedder.embed_text("some words to hash").await.expect("embed");
    assert!((vecmath::l2_norm(&v) - 1.0).abs() < 1e-3);
}
