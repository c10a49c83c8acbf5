//! Embedding front end: a provider behind a bounded single-text cache.
//!
//! Blank input maps to the zero vector of the configured dimension, a
//! "no semantic content" sentinel rather than an error. Batch embedding runs
//! in bounded sub-batches to cap peak memory, and retryable provider
//! failures are retried with exponential backoff before surfacing.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;
use tracing::{debug, warn};

use ragmem_core::error::{Error, Result};
use ragmem_core::retry::RetryPolicy;
use ragmem_core::traits::EmbeddingProvider;
use ragmem_core::vecmath;

pub mod provider;

pub use provider::hashed::HashedEmbedder;
pub use provider::http::HttpEmbedder;

/// Default capacity of the per-process embedding cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 4096;
/// Default texts per provider call when batch embedding.
pub const DEFAULT_BATCH_SIZE: usize = 32;

pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    cache: Mutex<LruCache<String, Vec<f32>>>,
    batch_size: usize,
    retry: RetryPolicy,
}

impl Embedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self::with_capacity(provider, DEFAULT_CACHE_CAPACITY, DEFAULT_BATCH_SIZE)
    }

    pub fn with_capacity(
        provider: Arc<dyn EmbeddingProvider>,
        cache_capacity: usize,
        batch_size: usize,
    ) -> Self {
        let capacity = NonZeroUsize::new(cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            provider,
            cache: Mutex::new(LruCache::new(capacity)),
            batch_size: batch_size.max(1),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Embedding dimensionality, fixed for the life of the instance.
    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Embed a single text. Identical text returns a bit-identical vector
    /// for the life of the process; results are cached by exact text match.
    pub async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Ok(vec![0.0; self.dimension()]);
        }
        if let Some(hit) = self.cache_get(text) {
            debug!(chars = text.len(), "embedding cache hit");
            return Ok(hit);
        }
        let mut vectors = self.call_provider(&[text.to_string()]).await?;
        let vector = vectors
            .pop()
            .ok_or_else(|| Error::Provider("provider returned no embedding".to_string()))?;
        self.check_dimension(&vector)?;
        self.cache_put(text, vector.clone());
        Ok(vector)
    }

    /// Embed many texts in input order, `batch_size` texts per provider
    /// call. Blank entries become zero vectors without reaching the
    /// provider. Does not consult the single-text cache, but the provider's
    /// determinism keeps results consistent with `embed_text`.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let dim = self.dimension();
        let mut out: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        let mut pending: Vec<usize> = Vec::new();
        for (i, text) in texts.iter().enumerate() {
            if text.trim().is_empty() {
                out[i] = Some(vec![0.0; dim]);
            } else {
                pending.push(i);
            }
        }
        for window in pending.chunks(self.batch_size) {
            let batch: Vec<String> = window.iter().map(|&i| texts[i].clone()).collect();
            let vectors = self.call_provider(&batch).await?;
            if vectors.len() != batch.len() {
                return Err(Error::Provider(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }
            for (&i, vector) in window.iter().zip(vectors) {
                self.check_dimension(&vector)?;
                out[i] = Some(vector);
            }
        }
        Ok(out.into_iter().flatten().collect())
    }

    /// L2-normalize each vector in place; zero vectors are left unchanged.
    pub fn normalize(vectors: &mut [Vec<f32>]) {
        for v in vectors.iter_mut() {
            vecmath::normalize_in_place(v);
        }
    }

    async fn call_provider(&self, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut attempt = 0u32;
        loop {
            match self.provider.embed_batch(batch).await {
                Ok(vectors) => return Ok(vectors),
                Err(e) if e.is_retryable() && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay(attempt);
                    warn!(
                        error = %e,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "embedding call failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension() {
            return Err(Error::Provider(format!(
                "provider returned dimension {}, expected {}",
                vector.len(),
                self.dimension()
            )));
        }
        Ok(())
    }

    fn cache_get(&self, text: &str) -> Option<Vec<f32>> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.get(text).cloned()
    }

    fn cache_put(&self, text: &str, vector: Vec<f32>) {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.put(text.to_string(), vector);
    }
}
