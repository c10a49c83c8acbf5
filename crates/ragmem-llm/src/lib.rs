//! Text-generation providers behind one async trait.
//!
//! Ollama speaks its native `/api/generate` endpoint; OpenAI-compatible
//! backends speak `/v1/chat/completions`. `Resilient` wraps either with
//! exponential-backoff retries for transient provider failures.

use std::sync::Arc;

use tracing::warn;

use ragmem_core::config::GenerationConfig;
use ragmem_core::error::{Error, Result};
use ragmem_core::retry::RetryPolicy;
use ragmem_core::traits::GenerationProvider;
use ragmem_core::types::{GenerationOutput, GenerationParams};

mod ollama;
mod openai;

pub use ollama::OllamaGenerator;
pub use openai::OpenAiGenerator;

/// Retry wrapper around any generation provider.
#[derive(Debug)]
pub struct Resilient<P> {
    inner: P,
    retry: RetryPolicy,
}

impl<P: GenerationProvider> Resilient<P> {
    pub fn new(inner: P, retry: RetryPolicy) -> Self {
        Self { inner, retry }
    }
}

#[async_trait::async_trait]
impl<P: GenerationProvider> GenerationProvider for Resilient<P> {
    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    async fn generate(&self, prompt: &str, params: GenerationParams) -> Result<GenerationOutput> {
        let mut attempt = 0;
        loop {
            match self.inner.generate(prompt, params).await {
                Ok(output) => return Ok(output),
                Err(e) if e.is_retryable() && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay(attempt);
                    warn!(attempt, ?delay, error = %e, "generation failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Build the configured generation provider, wrapped with retries.
pub fn from_config(config: &GenerationConfig) -> Result<Arc<dyn GenerationProvider>> {
    let retry = RetryPolicy { max_retries: config.max_retries, ..RetryPolicy::default() };
    match config.provider.as_str() {
        "ollama" => Ok(Arc::new(Resilient::new(
            OllamaGenerator::new(&config.base_url, &config.model)?,
            retry,
        ))),
        "openai" => Ok(Arc::new(Resilient::new(
            OpenAiGenerator::new(&config.base_url, config.api_key.as_deref(), &config.model)?,
            retry,
        ))),
        other => Err(Error::Config(format!("unknown generation provider: {other}"))),
    }
}
