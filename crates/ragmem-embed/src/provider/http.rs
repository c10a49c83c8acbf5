//! OpenAI-compatible `/v1/embeddings` client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use ragmem_core::config::EmbeddingConfig;
use ragmem_core::error::{Error, Result};
use ragmem_core::traits::EmbeddingProvider;

pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    dimension: usize,
}

fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

fn has_version_suffix(base_url: &str) -> bool {
    let Some(last_segment) = base_url.rsplit('/').next() else {
        return false;
    };
    let Some(rest) = last_segment.strip_prefix('v') else {
        return false;
    };
    !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit())
}

/// Derive the embeddings endpoint from a base URL that may already carry a
/// version segment or the full path.
fn embeddings_endpoint(base_url: &str) -> String {
    let normalized = normalize_base_url(base_url);
    if normalized.ends_with("/embeddings") {
        return normalized;
    }
    if has_version_suffix(&normalized) {
        return format!("{normalized}/embeddings");
    }
    format!("{normalized}/v1/embeddings")
}

impl HttpEmbedder {
    pub fn new(cfg: &EmbeddingConfig) -> Result<Self> {
        if cfg.dimension == 0 {
            return Err(Error::Config("embedding dimension must be positive".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Config(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            endpoint: embeddings_endpoint(&cfg.base_url),
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            dimension: cfg.dimension,
        })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for HttpEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let req = EmbeddingRequest { model: &self.model, input: texts };
        let mut call = self.client.post(&self.endpoint).json(&req);
        if let Some(key) = &self.api_key {
            call = call.bearer_auth(key);
        }
        let resp = call
            .send()
            .await
            .map_err(|e| Error::Provider(format!("embedding request failed: {e}")))?
            .error_for_status()
            .map_err(|e| Error::Provider(format!("embedding request rejected: {e}")))?;
        let body: EmbeddingResponse = resp
            .json()
            .await
            .map_err(|e| Error::Provider(format!("malformed embedding response: {e}")))?;
        if body.data.len() != texts.len() {
            return Err(Error::Provider(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                body.data.len()
            )));
        }
        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }
}
