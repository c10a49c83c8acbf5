//! Semantic retrieval over an embedded vector index.
//!
//! The retriever embeds a query, searches the shared index, and returns
//! ranked items. Cosine scores are filtered against a similarity floor;
//! L2 distances pass through unfiltered because a distance ceiling is a
//! caller-side decision, not a drop-in for a similarity floor.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use ragmem_core::error::{Error, Result};
use ragmem_core::types::{Metric, RetrievedItem};
use ragmem_core::vecmath;
use ragmem_embed::Embedder;
use ragmem_vector::VectorIndex;

pub mod assemble;

pub const DEFAULT_TOP_K: usize = 3;

pub struct Retriever {
    embedder: Arc<Embedder>,
    index: Arc<RwLock<VectorIndex>>,
    top_k: usize,
    threshold: f32,
}

/// Diagnostic view of a single retrieval pass.
#[derive(Debug, Clone)]
pub struct RetrievalExplanation {
    pub query: String,
    pub embedding_norm: f32,
    pub items: Vec<RetrievedItem>,
}

impl Retriever {
    pub fn new(embedder: Arc<Embedder>, index: Arc<RwLock<VectorIndex>>) -> Self {
        Self { embedder, index, top_k: DEFAULT_TOP_K, threshold: 0.0 }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Retrieve up to `k` chunks for a single query.
    ///
    /// Ranks reflect the index's native order before threshold filtering,
    /// so a filtered result can carry non-contiguous ranks.
    pub async fn retrieve(
        &self,
        query: &str,
        k: Option<usize>,
        threshold: Option<f32>,
    ) -> Result<Vec<RetrievedItem>> {
        if query.trim().is_empty() {
            return Err(Error::EmptyInput("query must not be blank".to_string()));
        }
        let k = k.unwrap_or(self.top_k);
        let threshold = threshold.unwrap_or(self.threshold);

        let query_vec = self.embedder.embed_text(query).await?;
        let index = self.index.read().await;
        let metric = index.metric();
        let results = index.search(&query_vec, k)?;
        drop(index);

        let mut items = Vec::with_capacity(results.texts.len());
        for (rank, ((text, score), metadata)) in results
            .texts
            .into_iter()
            .zip(results.scores)
            .zip(results.metadata)
            .enumerate()
        {
            if metric == Metric::Cosine && score < threshold {
                continue;
            }
            items.push(RetrievedItem { text, score, metadata, rank });
        }
        debug!(k, returned = items.len(), "retrieved chunks");
        Ok(items)
    }

    /// Fan a set of queries out, merge the hits, and keep the best `k`.
    ///
    /// Duplicate texts keep their best-scored occurrence; survivors are
    /// re-ranked from zero in merged score order.
    pub async fn retrieve_multi_query(
        &self,
        queries: &[String],
        k: Option<usize>,
    ) -> Result<Vec<RetrievedItem>> {
        let k = k.unwrap_or(self.top_k);
        let mut all_results = Vec::new();
        for query in queries {
            all_results.extend(self.retrieve(query, Some(k), None).await?);
        }

        let higher_is_better = self.index.read().await.metric().higher_is_better();
        if higher_is_better {
            all_results
                .sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        } else {
            all_results
                .sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal));
        }

        let mut seen = HashSet::new();
        let mut unique = Vec::new();
        for item in all_results {
            if !seen.insert(item.text.clone()) {
                continue;
            }
            unique.push(item);
            if unique.len() >= k {
                break;
            }
        }
        for (rank, item) in unique.iter_mut().enumerate() {
            item.rank = rank;
        }
        Ok(unique)
    }

    /// Drop later items whose word-set Jaccard similarity with an already
    /// kept item exceeds `overlap_threshold`. Order is preserved, so the
    /// better-ranked copy of near-duplicate chunks survives.
    pub fn deduplicate(
        &self,
        items: Vec<RetrievedItem>,
        overlap_threshold: f32,
    ) -> Vec<RetrievedItem> {
        let mut kept: Vec<RetrievedItem> = Vec::new();
        let mut kept_words: Vec<HashSet<String>> = Vec::new();
        for item in items {
            let words = word_set(&item.text);
            let duplicate = kept_words.iter().any(|existing| {
                jaccard(&words, existing) > overlap_threshold
            });
            if !duplicate {
                kept_words.push(words);
                kept.push(item);
            }
        }
        kept
    }

    /// Retrieve with enough detail to debug why chunks were selected.
    pub async fn explain(&self, query: &str, k: usize) -> Result<RetrievalExplanation> {
        let query_vec = self.embedder.embed_text(query).await?;
        let items = self.retrieve(query, Some(k), None).await?;
        Ok(RetrievalExplanation {
            query: query.to_string(),
            embedding_norm: vecmath::l2_norm(&query_vec),
            items,
        })
    }
}

/// Lowercased words with punctuation stripped. Underscores count as word
/// characters, everything else non-alphanumeric is removed.
fn word_set(text: &str) -> HashSet<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    cleaned.split_whitespace().map(str::to_string).collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    intersection as f32 / union as f32
}

#[cfg(test)]
mod tests {
    use super::{jaccard, word_set};

    #[test]
    fn word_set_strips_punctuation_and_case() {
        let words = word_set("The quick, brown FOX!");
        assert!(words.contains("the"));
        assert!(words.contains("quick"));
        assert!(words.contains("fox"));
        assert_eq!(words.len(), 4);
    }

    #[test]
    fn jaccard_of_disjoint_empty_sets_is_zero() {
        assert_eq!(jaccard(&word_set(""), &word_set("...")), 0.0);
    }

    #[test]
    fn jaccard_of_identical_sets_is_one() {
        let a = word_set("alpha beta gamma");
        assert!((jaccard(&a, &a) - 1.0).abs() < f32::EPSILON);
    }
}
