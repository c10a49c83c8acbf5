use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use walkdir::WalkDir;

use ragmem_core::chunker::TextChunker;
use ragmem_core::config::{
    expand_path, ChunkingConfig, Config, EmbeddingConfig, GenerationConfig, RetrievalConfig,
};
use ragmem_core::types::Metric;
use ragmem_embed::Embedder;
use ragmem_retrieve::assemble::ContextAssembler;
use ragmem_system::{MemorySystem, QueryOptions};

fn usage(program: &str) -> ! {
    eprintln!("Usage: {program} <command> [args]");
    eprintln!("Commands:");
    eprintln!("  ingest <dir>             Chunk, embed, and index .txt/.md files");
    eprintln!("  query '<question>'       Answer a question from indexed memory");
    eprintln!("                           [--top-k N] [--template NAME] [--show-prompt]");
    eprintln!("  stats                    Show index and model statistics");
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("ragmem");
    if args.len() < 2 {
        usage(program);
    }

    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let index_path = expand_path(
        config
            .get::<String>("storage.index_path")
            .unwrap_or_else(|_| "ragmem_index.json".to_string()),
    );

    match args[1].as_str() {
        "ingest" => {
            let Some(dir) = args.get(2) else {
                eprintln!("Error: ingest requires a directory");
                usage(program);
            };
            ingest(&config, &index_path, &expand_path(dir)).await
        }
        "query" => {
            let Some(question) = args.get(2) else {
                eprintln!("Error: query requires a question");
                usage(program);
            };
            let mut top_k = None;
            let mut template = None;
            let mut show_prompt = false;
            let mut i = 3;
            while i < args.len() {
                match args[i].as_str() {
                    "--top-k" => {
                        let Some(n) = args.get(i + 1).and_then(|v| v.parse::<usize>().ok()) else {
                            eprintln!("Error: --top-k requires a number");
                            std::process::exit(1);
                        };
                        top_k = Some(n);
                        i += 1;
                    }
                    "--template" => {
                        let Some(name) = args.get(i + 1) else {
                            eprintln!("Error: --template requires a name");
                            std::process::exit(1);
                        };
                        template = Some(name.clone());
                        i += 1;
                    }
                    "--show-prompt" => show_prompt = true,
                    other => eprintln!("Ignoring unknown flag: {other}"),
                }
                i += 1;
            }
            query(&config, &index_path, question, top_k, template, show_prompt).await
        }
        "stats" => stats(&config, &index_path).await,
        other => {
            eprintln!("Unknown command: {other}");
            usage(program);
        }
    }
}

fn build_system(config: &Config) -> anyhow::Result<MemorySystem> {
    let chunking: ChunkingConfig = config.section("chunking")?;
    let embedding: EmbeddingConfig = config.section("embedding")?;
    let retrieval: RetrievalConfig = config.section("retrieval")?;
    let generation: GenerationConfig = config.section("generation")?;

    let chunker = TextChunker::new(chunking.chunk_size, chunking.overlap)?;
    let provider = ragmem_embed::provider::from_config(&embedding)?;
    let embedder = Arc::new(Embedder::with_capacity(
        provider,
        embedding.cache_capacity,
        embedding.batch_size,
    ));
    let metric: Metric = retrieval.metric.parse()?;
    let assembler = ContextAssembler::new(retrieval.max_context_length);
    let generator = ragmem_llm::from_config(&generation)?;

    let system = MemorySystem::new(chunker, embedder, metric, assembler, generator)?
        .with_retrieval(retrieval.top_k, retrieval.threshold);
    Ok(system)
}

async fn ingest(config: &Config, index_path: &Path, dir: &Path) -> anyhow::Result<()> {
    let system = build_system(config)?;
    if index_path.exists() {
        system.load(index_path).await?;
    }

    let files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            matches!(
                e.path().extension().and_then(|x| x.to_str()),
                Some("txt") | Some("md")
            )
        })
        .map(|e| e.into_path())
        .collect();
    if files.is_empty() {
        println!("No .txt or .md files found under {}", dir.display());
        return Ok(());
    }

    println!("ragmem ingest\n=============");
    println!("Directory: {}", dir.display());
    let bar = ProgressBar::new(files.len() as u64);
    bar.set_style(ProgressStyle::with_template(
        "{bar:40.cyan/blue} {pos}/{len} {msg}",
    )?);
    let mut chunks_total = 0usize;
    for file in &files {
        bar.set_message(
            file.file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("?")
                .to_string(),
        );
        match system.ingest_file(file).await {
            Ok(report) => chunks_total += report.chunks_added,
            Err(e) => eprintln!("⚠️  Skipping {}: {}", file.display(), e),
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    system.save(index_path).await?;
    let stats = system.stats().await;
    println!("✅ Ingested {} files ({} chunks)", files.len(), chunks_total);
    println!("📊 Index now holds {} chunks at {}", stats.index.count, index_path.display());
    Ok(())
}

async fn query(
    config: &Config,
    index_path: &Path,
    question: &str,
    top_k: Option<usize>,
    template: Option<String>,
    show_prompt: bool,
) -> anyhow::Result<()> {
    let system = build_system(config)?;
    system.load(index_path).await?;

    let options = QueryOptions {
        top_k,
        template,
        return_prompt: show_prompt,
        ..Default::default()
    };
    let answer = system.query(question, options).await?;

    println!("🔍 Q: {}\n", question);
    println!("{}\n", answer.response);
    if !answer.citations.is_empty() {
        println!("Sources:");
        for citation in &answer.citations {
            println!("  {citation}");
        }
    }
    println!(
        "\nmodel={} tokens={} latency={}ms",
        answer.model, answer.usage.total, answer.latency_ms
    );
    if let Some(prompt) = answer.prompt {
        println!("\n--- prompt ---\n{prompt}");
    }
    Ok(())
}

async fn stats(config: &Config, index_path: &Path) -> anyhow::Result<()> {
    let system = build_system(config)?;
    if index_path.exists() {
        system.load(index_path).await?;
    }
    let stats = system.stats().await;
    println!("ragmem stats\n============");
    println!("Index path:       {}", index_path.display());
    println!("Chunks:           {}", stats.index.count);
    println!("Dimension:        {}", stats.index.dimension);
    println!("Metric:           {}", stats.index.metric);
    println!("Embedding model:  {}", stats.embedding_model);
    println!("Generation model: {}", stats.generation_model);
    Ok(())
}
