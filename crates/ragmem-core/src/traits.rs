use async_trait::async_trait;

use crate::error::Result;
use crate::types::{GenerationOutput, GenerationParams};

/// Maps text to fixed-dimension dense vectors.
///
/// Implementations must be deterministic within a process: the same text
/// yields the same vector, and `dimension` never changes for the life of
/// the instance.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embedding dimensionality (D).
    fn dimension(&self) -> usize;
    /// Stable identifier for the backing model.
    fn model_name(&self) -> &str;
    /// Compute embeddings for a batch of input texts, one vector per text,
    /// in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Black-box generation capability: prompt in, text plus accounting out.
///
/// Selected once at construction; failures surface as `Error::Provider`.
#[async_trait]
pub trait GenerationProvider: std::fmt::Debug + Send + Sync {
    fn model_name(&self) -> &str;
    async fn generate(&self, prompt: &str, params: GenerationParams) -> Result<GenerationOutput>;
}
