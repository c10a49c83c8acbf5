//! Embedding provider implementations.
//!
//! A provider is selected once at construction; the rest of the pipeline
//! only sees the `EmbeddingProvider` capability trait.

pub mod hashed;
pub mod http;

use std::sync::Arc;

use ragmem_core::config::EmbeddingConfig;
use ragmem_core::error::{Error, Result};
use ragmem_core::traits::EmbeddingProvider;

/// Build the provider named by config: `hashed` (offline, deterministic) or
/// `http` (OpenAI-compatible endpoint).
pub fn from_config(cfg: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match cfg.provider.as_str() {
        "hashed" => Ok(Arc::new(hashed::HashedEmbedder::new(cfg.dimension))),
        "http" => Ok(Arc::new(http::HttpEmbedder::new(cfg)?)),
        other => Err(Error::Config(format!("unsupported embedding provider: {other}"))),
    }
}
