use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use ragmem_core::config::GenerationConfig;
use ragmem_core::error::{Error, Result};
use ragmem_core::retry::RetryPolicy;
use ragmem_core::traits::GenerationProvider;
use ragmem_core::types::{GenerationOutput, GenerationParams, TokenUsage};
use ragmem_llm::Resilient;

/// Fails with the given error until `failures` attempts have been burned.
#[derive(Debug)]
struct FlakyGenerator {
    failures: AtomicUsize,
    calls: Arc<AtomicUsize>,
    error: fn() -> Error,
}

#[async_trait]
impl GenerationProvider for FlakyGenerator {
    fn model_name(&self) -> &str {
        "flaky"
    }

    async fn generate(&self, prompt: &str, _params: GenerationParams) -> Result<GenerationOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err((self.error)());
        }
        Ok(GenerationOutput {
            response: format!("echo: {prompt}"),
            model: "flaky".to_string(),
            usage: TokenUsage::default(),
            latency_ms: 1,
        })
    }
}

fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy { max_retries, base_backoff_ms: 1, max_backoff_ms: 5 }
}

#[tokio::test]
async fn transient_failures_are_retried_until_success() {
    let calls = Arc::new(AtomicUsize::new(0));
    let provider = Resilient::new(
        FlakyGenerator {
            failures: AtomicUsize::new(2),
            calls: calls.clone(),
            error: || Error::Provider("backend unavailable".to_string()),
        },
        fast_retry(3),
    );
    let output = provider.generate("hello", GenerationParams::default()).await.expect("recovers");
    assert_eq!(output.response, "echo: hello");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn exhausted_retries_surface_the_last_error() {
    let calls = Arc::new(AtomicUsize::new(0));
    let provider = Resilient::new(
        FlakyGenerator {
            failures: AtomicUsize::new(100),
            calls: calls.clone(),
            error: || Error::Provider("backend unavailable".to_string()),
        },
        fast_retry(2),
    );
    let err = provider
        .generate("hello", GenerationParams::default())
        .await
        .expect_err("gives up");
    assert!(matches!(err, Error::Provider(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 3, "initial attempt plus two retries");
}

#[tokio::test]
async fn non_retryable_errors_fail_immediately() {
    let calls = Arc::new(AtomicUsize::new(0));
    let provider = Resilient::new(
        FlakyGenerator {
            failures: AtomicUsize::new(100),
            calls: calls.clone(),
            error: || Error::Validation("bad prompt".to_string()),
        },
        fast_retry(5),
    );
    let err = provider
        .generate("hello", GenerationParams::default())
        .await
        .expect_err("fails fast");
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn unknown_provider_name_is_a_config_error() {
    let config = GenerationConfig { provider: "carrier-pigeon".to_string(), ..Default::default() };
    let err = ragmem_llm::from_config(&config).expect_err("unknown provider");
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn known_providers_construct_from_config() {
    for provider in ["ollama", "openai"] {
        let config = GenerationConfig { provider: provider.to_string(), ..Default::default() };
        let built = ragmem_llm::from_config(&config).expect("constructs");
        assert_eq!(built.model_name(), config.model);
    }
}
