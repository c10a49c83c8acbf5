//! OpenAI-compatible chat completions backend.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use ragmem_core::error::{Error, Result};
use ragmem_core::traits::GenerationProvider;
use ragmem_core::types::{GenerationOutput, GenerationParams, TokenUsage};

#[derive(Debug)]
pub struct OpenAiGenerator {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: ChatUsage,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Deserialize, Default)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

impl OpenAiGenerator {
    pub fn new(base_url: &str, api_key: Option<&str>, model: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Provider(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            endpoint: chat_endpoint(base_url),
            api_key: api_key.map(str::to_string),
            model: model.to_string(),
        })
    }
}

/// Derive the chat completions endpoint, tolerating bases that already
/// carry a version suffix (e.g. `https://host/v1`).
fn chat_endpoint(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if has_version_suffix(base) {
        format!("{base}/chat/completions")
    } else {
        format!("{base}/v1/chat/completions")
    }
}

fn has_version_suffix(base: &str) -> bool {
    base.rsplit('/')
        .next()
        .is_some_and(|seg| {
            seg.len() > 1
                && seg.starts_with('v')
                && seg[1..].chars().all(|c| c.is_ascii_digit())
        })
}

#[async_trait::async_trait]
impl GenerationProvider for OpenAiGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, params: GenerationParams) -> Result<GenerationOutput> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            max_tokens: params.max_tokens,
            temperature: params.temperature,
        };

        let started = Instant::now();
        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| Error::Provider(format!("chat request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!("chat backend returned {status}: {body}")));
        }
        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("invalid chat response: {e}")))?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Provider("chat response contained no choices".to_string()))?;

        Ok(GenerationOutput {
            response: choice.message.content,
            model: self.model.clone(),
            usage: TokenUsage {
                prompt: parsed.usage.prompt_tokens,
                completion: parsed.usage.completion_tokens,
                total: parsed.usage.total_tokens,
            },
            latency_ms: started.elapsed().as_millis() as u64,
        })
    }
}
