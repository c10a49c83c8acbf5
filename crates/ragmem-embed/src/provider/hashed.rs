use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use twox_hash::XxHash64;

use ragmem_core::error::{Error, Result};
use ragmem_core::traits::EmbeddingProvider;
use ragmem_core::vecmath;

/// Deterministic offline embedder: each whitespace token is hashed into a
/// bucket and the resulting bag vector is L2-normalized. Not semantically
/// meaningful, but stable across processes, which is exactly what tests and
/// offline smoke runs need.
pub struct HashedEmbedder {
    dimension: usize,
    name: String,
}

impl HashedEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { name: format!("hashed:d{dimension}"), dimension }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dimension];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dimension;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        vecmath::normalize_in_place(&mut v);
        v
    }
}

#[async_trait]
impl EmbeddingProvider for HashedEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.name
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if self.dimension == 0 {
            return Err(Error::Config("dimension must be positive".to_string()));
        }
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}
