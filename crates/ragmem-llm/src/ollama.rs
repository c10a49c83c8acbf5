//! Ollama backend over its native generate endpoint.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use ragmem_core::error::{Error, Result};
use ragmem_core::traits::GenerationProvider;
use ragmem_core::types::{GenerationOutput, GenerationParams, TokenUsage};

#[derive(Debug)]
pub struct OllamaGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
    #[serde(default)]
    prompt_eval_count: u64,
    #[serde(default)]
    eval_count: u64,
}

impl OllamaGenerator {
    pub fn new(base_url: &str, model: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            // Local models can take minutes on a long prompt.
            .timeout(Duration::from_secs(300))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Provider(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            endpoint: format!("{}/api/generate", base_url.trim_end_matches('/')),
            model: model.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl GenerationProvider for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, params: GenerationParams) -> Result<GenerationOutput> {
        let request = OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: OllamaOptions {
                temperature: params.temperature,
                num_predict: params.max_tokens,
            },
        };

        let started = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("ollama request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!("ollama returned {status}: {body}")));
        }
        let parsed: OllamaResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("invalid ollama response: {e}")))?;

        Ok(GenerationOutput {
            response: parsed.response,
            model: self.model.clone(),
            usage: TokenUsage {
                prompt: parsed.prompt_eval_count,
                completion: parsed.eval_count,
                total: parsed.prompt_eval_count + parsed.eval_count,
            },
            latency_ms: started.elapsed().as_millis() as u64,
        })
    }
}
