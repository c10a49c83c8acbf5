//! Versioned JSON snapshot persistence for `VectorIndex`.
//!
//! A snapshot round-trips exactly: vectors, texts, metadata, dimension, and
//! metric. Loading validates the version and the parallel-array invariants
//! instead of silently coercing an incompatible file.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use ragmem_core::error::{Error, Result};
use ragmem_core::types::{Meta, Metric};

use crate::VectorIndex;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct IndexSnapshot {
    version: u32,
    dimension: usize,
    metric: Metric,
    vectors: Vec<Vec<f32>>,
    texts: Vec<String>,
    metadata: Vec<Meta>,
}

impl VectorIndex {
    /// Write the full index state to `path` as JSON, creating parent
    /// directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    Error::Storage(format!("failed to create {}: {e}", parent.display()))
                })?;
            }
        }
        let (vectors, texts, metadata) = self.parts();
        let snapshot = IndexSnapshot {
            version: SNAPSHOT_VERSION,
            dimension: self.dimension(),
            metric: self.metric(),
            vectors: vectors.to_vec(),
            texts: texts.to_vec(),
            metadata: metadata.to_vec(),
        };
        let json = serde_json::to_string(&snapshot)
            .map_err(|e| Error::Storage(format!("failed to serialize index: {e}")))?;
        fs::write(path, json)
            .map_err(|e| Error::Storage(format!("failed to write {}: {e}", path.display())))?;
        info!(path = %path.display(), count = self.len(), "saved index snapshot");
        Ok(())
    }

    /// Reconstruct an index from a snapshot written by `save`.
    ///
    /// A missing path is `NotFound`; a corrupt or internally inconsistent
    /// snapshot (bad JSON, unknown version, unparallel arrays, wrong
    /// per-vector dimension) is a `Validation` error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(format!("index snapshot not found: {}", path.display())));
        }
        let raw = fs::read_to_string(path)
            .map_err(|e| Error::Storage(format!("failed to read {}: {e}", path.display())))?;
        let snap: IndexSnapshot = serde_json::from_str(&raw).map_err(|e| {
            Error::Validation(format!("corrupt snapshot at {}: {e}", path.display()))
        })?;
        if snap.version != SNAPSHOT_VERSION {
            return Err(Error::Validation(format!(
                "unsupported snapshot version {} at {}",
                snap.version,
                path.display()
            )));
        }
        if snap.dimension == 0 {
            return Err(Error::Validation("snapshot dimension must be positive".to_string()));
        }
        if snap.vectors.len() != snap.texts.len() || snap.texts.len() != snap.metadata.len() {
            return Err(Error::Validation(format!(
                "snapshot arrays are not parallel: {} vectors, {} texts, {} metadata",
                snap.vectors.len(),
                snap.texts.len(),
                snap.metadata.len()
            )));
        }
        for v in &snap.vectors {
            if v.len() != snap.dimension {
                return Err(Error::Validation(format!(
                    "snapshot vector dimension {} does not match declared dimension {}",
                    v.len(),
                    snap.dimension
                )));
            }
        }
        info!(path = %path.display(), count = snap.texts.len(), "loaded index snapshot");
        Ok(VectorIndex::from_parts(
            snap.dimension,
            snap.metric,
            snap.vectors,
            snap.texts,
            snap.metadata,
        ))
    }
}
