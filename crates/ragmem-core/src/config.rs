//! Configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env
//! vars. Typed sections fall back to their serde defaults when absent, so a
//! bare checkout runs with no config file at all. Also provides helpers to
//! expand `~` and `${VAR}` and to resolve relative paths against a base
//! directory.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment })
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Extract a typed section, falling back to its `Default` when the key
    /// is absent entirely.
    pub fn section<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        match self.figment.extract_inner::<T>(key) {
            Ok(section) => Ok(section),
            Err(e) if e.missing() => Ok(T::default()),
            Err(e) => Err(anyhow::anyhow!("Failed to read '{}': {}", key, e)),
        }
    }
}

/// `[chunking]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Words per chunk.
    pub chunk_size: usize,
    /// Overlapping words between consecutive chunks.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 300, overlap: 50 }
    }
}

/// `[embedding]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `hashed` (offline, deterministic) or `http` (OpenAI-compatible).
    pub provider: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub dimension: usize,
    /// Entries kept in the single-text LRU cache.
    pub cache_capacity: usize,
    /// Texts per provider call when batch embedding.
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "hashed".to_string(),
            base_url: "https://api.openai.com".to_string(),
            api_key: None,
            model: "text-embedding-3-small".to_string(),
            dimension: 384,
            cache_capacity: 4096,
            batch_size: 32,
        }
    }
}

/// `[retrieval]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// `cosine` or `l2`.
    pub metric: String,
    pub top_k: usize,
    /// Similarity floor; only applied under the cosine metric.
    pub threshold: f32,
    /// Character budget for assembled context.
    pub max_context_length: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            metric: "cosine".to_string(),
            top_k: 3,
            threshold: 0.0,
            max_context_length: 4000,
        }
    }
}

/// `[generation]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// `ollama` or `openai`.
    pub provider: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Retries after the initial attempt on provider failure.
    pub max_retries: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            base_url: "http://localhost:11434".to_string(),
            api_key: None,
            model: "llama3".to_string(),
            max_tokens: 1000,
            temperature: 0.7,
            max_retries: 2,
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after
/// expansion. Absolute paths are returned as-is.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() {
        p
    } else {
        base.join(p)
    }
}
