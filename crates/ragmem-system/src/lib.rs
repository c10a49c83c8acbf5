//! Orchestrates the full pipeline: chunk, embed, store, retrieve, prompt,
//! generate, cite.
//!
//! The index sits behind an async `RwLock` shared with the retriever, so
//! concurrent queries proceed in parallel while ingest and load take the
//! lock exclusively.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::info;

use ragmem_core::chunker::TextChunker;
use ragmem_core::error::{Error, Result};
use ragmem_core::traits::GenerationProvider;
use ragmem_core::types::{ChatTurn, GenerationParams, Meta, Metric, RetrievedItem, TokenUsage};
use ragmem_embed::Embedder;
use ragmem_retrieve::assemble::ContextAssembler;
use ragmem_retrieve::Retriever;
use ragmem_vector::{IndexStats, VectorIndex};

pub struct MemorySystem {
    chunker: TextChunker,
    embedder: Arc<Embedder>,
    index: Arc<RwLock<VectorIndex>>,
    retriever: Retriever,
    assembler: ContextAssembler,
    generator: Arc<dyn GenerationProvider>,
}

/// What one ingest call did.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub chunks_added: usize,
    pub index_size: usize,
}

/// Per-query overrides. `..Default::default()` leaves the system's
/// configured behavior in place.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub top_k: Option<usize>,
    pub threshold: Option<f32>,
    pub template: Option<String>,
    pub history: Vec<ChatTurn>,
    /// Jaccard threshold above which near-duplicate chunks are dropped
    /// before prompting.
    pub dedup_overlap: Option<f32>,
    pub generation: GenerationParams,
    /// Include the fully assembled prompt in the answer.
    pub return_prompt: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemoryAnswer {
    pub response: String,
    pub citations: Vec<String>,
    pub retrieved: Vec<RetrievedItem>,
    pub model: String,
    pub usage: TokenUsage,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemStats {
    pub index: IndexStats,
    pub embedding_model: String,
    pub generation_model: String,
}

impl MemorySystem {
    pub fn new(
        chunker: TextChunker,
        embedder: Arc<Embedder>,
        metric: Metric,
        assembler: ContextAssembler,
        generator: Arc<dyn GenerationProvider>,
    ) -> Result<Self> {
        let index = Arc::new(RwLock::new(VectorIndex::new(embedder.dimension(), metric)?));
        let retriever = Retriever::new(embedder.clone(), index.clone());
        Ok(Self { chunker, embedder, index, retriever, assembler, generator })
    }

    pub fn with_retrieval(mut self, top_k: usize, threshold: f32) -> Self {
        self.retriever = self.retriever.with_top_k(top_k).with_threshold(threshold);
        self
    }

    /// Chunk, embed, and store one document.
    ///
    /// `source_meta` (e.g. `source`, `file_type`, `extension`) is copied
    /// into every chunk's metadata alongside the chunk id, 0-based chunk
    /// index, and the chunk's character offset into the normalized text.
    pub async fn ingest(&self, text: &str, source_meta: Meta) -> Result<IngestReport> {
        let chunks = self.chunker.chunk_with_metadata(text);
        if chunks.is_empty() {
            return Err(Error::EmptyInput("document contains no words".to_string()));
        }

        let words: Vec<&str> = text.split_whitespace().collect();
        let step = self.chunker.chunk_size() - self.chunker.overlap();
        let metadata: Vec<Meta> = chunks
            .iter()
            .map(|chunk| {
                let start_word = chunk.position * step;
                let char_offset: usize =
                    words[..start_word.min(words.len())].iter().map(|w| w.chars().count() + 1).sum();
                let mut meta = source_meta.clone();
                meta.insert("chunk_id".to_string(), chunk.id.clone());
                meta.insert("chunk_index".to_string(), chunk.position.to_string());
                meta.insert("char_offset".to_string(), char_offset.to_string());
                meta
            })
            .collect();

        let texts: Vec<String> = chunks.into_iter().map(|c| c.text).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        let mut index = self.index.write().await;
        let chunks_added = texts.len();
        index.add(vectors, texts, Some(metadata))?;
        let index_size = index.len();
        drop(index);

        info!(chunks_added, index_size, "ingested document");
        Ok(IngestReport { chunks_added, index_size })
    }

    /// Read and ingest a file, deriving `source`, `extension`, and
    /// `file_type` metadata from its name.
    pub async fn ingest_file(&self, path: &Path) -> Result<IngestReport> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Storage(format!("failed to read {}: {e}", path.display())))?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("txt")
            .to_string();
        let source = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        let mut meta = Meta::new();
        meta.insert("source".to_string(), source);
        meta.insert("file_type".to_string(), file_type_for(&ext).to_string());
        meta.insert("extension".to_string(), ext);
        self.ingest(&text, meta).await
    }

    /// Answer a question from memory: retrieve, assemble, generate, cite.
    pub async fn query(&self, question: &str, options: QueryOptions) -> Result<MemoryAnswer> {
        let mut items = self
            .retriever
            .retrieve(question, options.top_k, options.threshold)
            .await?;
        if let Some(overlap) = options.dedup_overlap {
            items = self.retriever.deduplicate(items, overlap);
        }

        let prompt = if options.history.is_empty() {
            let template = options.template.as_deref().unwrap_or("default");
            self.assembler.assemble_prompt(question, &items, template)
        } else {
            self.assembler
                .create_conversational_prompt(question, &items, &options.history)
        };

        let output = self.generator.generate(&prompt, options.generation).await?;
        let cited = self.assembler.add_citations(&output.response, &items);

        Ok(MemoryAnswer {
            response: cited.response,
            citations: cited.citations,
            retrieved: items,
            model: output.model,
            usage: output.usage,
            latency_ms: output.latency_ms,
            prompt: options.return_prompt.then_some(prompt),
        })
    }

    /// Persist the index to disk.
    pub async fn save(&self, path: &Path) -> Result<()> {
        self.index.read().await.save(path)
    }

    /// Replace the in-memory index with a snapshot from disk.
    ///
    /// A snapshot whose dimension disagrees with the configured embedder is
    /// rejected, leaving the current index in place.
    pub async fn load(&self, path: &Path) -> Result<()> {
        let loaded = VectorIndex::load(path)?;
        if loaded.dimension() != self.embedder.dimension() {
            return Err(Error::Validation(format!(
                "snapshot dimension {} does not match embedder dimension {}",
                loaded.dimension(),
                self.embedder.dimension()
            )));
        }
        *self.index.write().await = loaded;
        Ok(())
    }

    pub async fn clear(&self) {
        self.index.write().await.clear();
    }

    pub async fn stats(&self) -> SystemStats {
        SystemStats {
            index: self.index.read().await.stats(),
            embedding_model: self.embedder.model_name().to_string(),
            generation_model: self.generator.model_name().to_string(),
        }
    }
}

/// Coarse file-type label for ingest metadata.
fn file_type_for(ext: &str) -> &'static str {
    match ext {
        "md" => "markdown",
        "py" => "python",
        "js" => "javascript",
        "ts" => "typescript",
        "html" => "html",
        "css" => "css",
        "txt" => "text",
        "yaml" | "yml" | "env" => "config",
        "json" | "csv" => "data",
        "sql" => "database",
        "sh" | "bash" => "shell",
        "go" => "go",
        "rs" => "rust",
        "c" => "c",
        "cpp" => "cpp",
        "h" | "hpp" => "header",
        "java" => "java",
        "rb" => "ruby",
        _ => "text",
    }
}
