//! Flat vector index over parallel vector/text/metadata arrays.
//!
//! Cosine indexes store L2-normalized copies and compare by inner product;
//! L2 indexes compare by squared Euclidean distance. The three arrays stay
//! aligned through every mutation, and search never hands callers an entry
//! that does not exist.

use serde::Serialize;
use tracing::debug;

use ragmem_core::error::{Error, Result};
use ragmem_core::types::{Meta, Metric};
use ragmem_core::vecmath::{dot, normalize_in_place, squared_l2};

mod snapshot;

#[derive(Debug)]
pub struct VectorIndex {
    dimension: usize,
    metric: Metric,
    vectors: Vec<Vec<f32>>,
    texts: Vec<String>,
    metadata: Vec<Meta>,
}

/// Search output: parallel texts/scores/metadata in rank order.
#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub texts: Vec<String>,
    pub scores: Vec<f32>,
    pub metadata: Vec<Meta>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub count: usize,
    pub dimension: usize,
    pub metric: Metric,
}

impl VectorIndex {
    pub fn new(dimension: usize, metric: Metric) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::Config("index dimension must be positive".to_string()));
        }
        Ok(Self {
            dimension,
            metric,
            vectors: Vec::new(),
            texts: Vec::new(),
            metadata: Vec::new(),
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    pub(crate) fn from_parts(
        dimension: usize,
        metric: Metric,
        vectors: Vec<Vec<f32>>,
        texts: Vec<String>,
        metadata: Vec<Meta>,
    ) -> Self {
        Self { dimension, metric, vectors, texts, metadata }
    }

    pub(crate) fn parts(&self) -> (&[Vec<f32>], &[String], &[Meta]) {
        (&self.vectors, &self.texts, &self.metadata)
    }

    /// Append vectors with their chunk texts and metadata.
    ///
    /// Lengths must agree; missing metadata is filled with one empty record
    /// per item. Cosine indexes normalize vectors at insert time.
    pub fn add(
        &mut self,
        mut vectors: Vec<Vec<f32>>,
        texts: Vec<String>,
        metadata: Option<Vec<Meta>>,
    ) -> Result<()> {
        if vectors.len() != texts.len() {
            return Err(Error::Validation(format!(
                "vector/text count mismatch: {} vs {}",
                vectors.len(),
                texts.len()
            )));
        }
        if let Some(meta) = &metadata {
            if meta.len() != texts.len() {
                return Err(Error::Validation(format!(
                    "metadata/text count mismatch: {} vs {}",
                    meta.len(),
                    texts.len()
                )));
            }
        }
        for v in &vectors {
            if v.len() != self.dimension {
                return Err(Error::Validation(format!(
                    "vector dimension {} does not match index dimension {}",
                    v.len(),
                    self.dimension
                )));
            }
        }
        if self.metric == Metric::Cosine {
            for v in &mut vectors {
                normalize_in_place(v);
            }
        }
        let metadata = metadata.unwrap_or_else(|| vec![Meta::new(); texts.len()]);
        let added = texts.len();
        self.vectors.extend(vectors);
        self.texts.extend(texts);
        self.metadata.extend(metadata);
        debug_assert_eq!(self.vectors.len(), self.texts.len());
        debug_assert_eq!(self.texts.len(), self.metadata.len());
        debug!(added, total = self.len(), "added vectors to index");
        Ok(())
    }

    /// k-nearest-neighbor scan in the index's metric.
    ///
    /// The result never exceeds the stored count, and the native rank order
    /// is ascending distance for L2 and descending similarity for cosine.
    pub fn search(&self, query: &[f32], k: usize) -> Result<SearchResults> {
        if query.len() != self.dimension {
            return Err(Error::Validation(format!(
                "query dimension {} does not match index dimension {}",
                query.len(),
                self.dimension
            )));
        }
        if k == 0 || self.is_empty() {
            return Ok(SearchResults::default());
        }

        let mut scored: Vec<(usize, f32)> = match self.metric {
            Metric::Cosine => {
                let mut q = query.to_vec();
                normalize_in_place(&mut q);
                self.vectors.iter().enumerate().map(|(i, v)| (i, dot(&q, v))).collect()
            }
            Metric::L2 => self
                .vectors
                .iter()
                .enumerate()
                .map(|(i, v)| (i, squared_l2(query, v)))
                .collect(),
        };
        if self.metric.higher_is_better() {
            scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        } else {
            scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        }
        scored.truncate(k.min(self.len()));

        let mut results = SearchResults::default();
        for (idx, score) in scored {
            results.texts.push(self.texts[idx].clone());
            results.scores.push(score);
            results.metadata.push(self.metadata[idx].clone());
        }
        Ok(results)
    }

    /// Reset to an empty index of the same dimension and metric.
    pub fn clear(&mut self) {
        self.vectors.clear();
        self.texts.clear();
        self.metadata.clear();
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats { count: self.len(), dimension: self.dimension, metric: self.metric }
    }
}
