//! Domain types shared across the retrieval pipeline.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Error;

/// Per-chunk metadata record (`source`, `file_type`, `extension`,
/// `chunk_index`, `char_offset`, ...). Values the core never parses.
pub type Meta = HashMap<String, String>;

/// A bounded text segment produced by splitting a document for independent
/// embedding and retrieval. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Content-derived unique id (`<doc-hash>:<position>`).
    pub id: String,
    pub text: String,
    /// 0-based position within the parent document.
    pub position: usize,
    pub word_count: usize,
    pub char_count: usize,
}

/// Similarity function used to compare vectors.
///
/// `L2` scores are squared Euclidean distances (lower is better). `Cosine`
/// scores are inner products over vectors normalized at insert and query
/// time (higher is better).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    L2,
    Cosine,
}

impl Metric {
    /// True when larger scores indicate closer matches.
    pub fn higher_is_better(self) -> bool {
        matches!(self, Metric::Cosine)
    }
}

impl std::str::FromStr for Metric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.to_ascii_lowercase().as_str() {
            "l2" => Ok(Metric::L2),
            "cosine" => Ok(Metric::Cosine),
            other => Err(Error::Config(format!("unsupported metric: {other}"))),
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::L2 => write!(f, "l2"),
            Metric::Cosine => write!(f, "cosine"),
        }
    }
}

/// One retrieval result. Ephemeral: produced per query, never persisted.
///
/// `rank` is the 0-based position in the index's native result order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedItem {
    pub text: String,
    pub score: f32,
    pub metadata: Meta,
    pub rank: usize,
}

/// Token accounting reported by a generation backend.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt: u64,
    pub completion: u64,
    pub total: u64,
}

/// What a generation backend returns for one prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOutput {
    pub response: String,
    pub model: String,
    pub usage: TokenUsage,
    pub latency_ms: u64,
}

/// Sampling knobs passed through to the generation backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self { max_tokens: 1000, temperature: 0.7 }
    }
}

/// A prior conversation turn rendered into conversational prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}
