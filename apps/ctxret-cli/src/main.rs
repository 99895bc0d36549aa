//! ctxret - index one document and ask it questions with contextual hybrid retrieval.
//!
//! # Usage
//!
//! ```bash
//! ctxret report.pdf                      # interactive session, mock contexts
//! ctxret report.pdf --real-context       # contexts from the Anthropic API
//! ctxret notes.md --query "what changed?" --json
//! ```

mod output;
mod session;

use anyhow::Result;
use clap::Parser;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ctxret_context::generator_from_settings;
use ctxret_core::chunker::{Chunker, ChunkingConfig, Tokenization};
use ctxret_core::config::{expand_path, Config, ContextProvider, Settings};
use ctxret_core::loader::load_document;
use ctxret_embed::{get_default_embedder, resolve_model_dir};
use ctxret_hybrid::{HybridRetriever, IndexingPipeline, RetrieverConfig};
use ctxret_text::TantivyLexicalIndex;
use ctxret_vector::LanceVectorIndex;

/// Contextual hybrid retrieval over a single document.
#[derive(Parser)]
#[command(name = "ctxret", version, about)]
struct Cli {
    /// Document to index (.pdf, .txt or .md)
    document: PathBuf,

    /// Generate chunk contexts with the Anthropic API instead of the mock
    #[arg(long)]
    real_context: bool,

    /// Number of results per question (default from config)
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Search the raw text embeddings instead of the contextual ones
    #[arg(long)]
    raw_embeddings: bool,

    /// Answer a single question and exit
    #[arg(short, long)]
    query: Option<String>,

    /// Output results as JSON (with --query)
    #[arg(long)]
    json: bool,

    /// Show full chunk text instead of a preview
    #[arg(long)]
    full_text: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn apply_overrides(settings: &mut Settings, cli: &Cli) {
    if cli.real_context {
        settings.context.provider = ContextProvider::Anthropic;
    }
    if let Some(k) = cli.top_k {
        settings.retrieval.top_k = k;
    }
    if cli.raw_embeddings {
        settings.retrieval.use_contextual = false;
    }
}

/// Configured tokenizer, else the embedding model's own, else whitespace words.
fn tokenization(settings: &Settings) -> Result<Tokenization> {
    if let Some(path) = &settings.chunking.tokenizer_path {
        return Ok(Tokenization::from_file(&expand_path(path))?);
    }
    if !settings.embedding.use_fake {
        if let Ok(dir) = resolve_model_dir(settings.embedding.model_dir.as_deref()) {
            let path = dir.join("tokenizer.json");
            if path.exists() {
                info!(tokenizer = %path.display(), "chunking with model tokenizer");
                return Ok(Tokenization::from_file(&path)?);
            }
        }
    }
    info!("chunking on whitespace-separated words");
    Ok(Tokenization::Whitespace)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "info" } else { "warn" }));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();

    let mut settings = Config::load()?.settings()?;
    apply_overrides(&mut settings, &cli);
    settings.validate()?;
    let quiet = cli.json;

    if !quiet { println!("{}", output::banner()); }
    let document = load_document(&cli.document)?;
    if !quiet { println!("📄 Loaded {} ({} characters)", cli.document.display(), document.chars().count()); }

    let chunking = ChunkingConfig::new(settings.chunking.chunk_size, settings.chunking.chunk_overlap)?;
    let chunker = Chunker::new(chunking, tokenization(&settings)?)?;
    let embedder = get_default_embedder(&settings.embedding)?;
    let generator = generator_from_settings(&settings.context)?;
    if !quiet {
        match settings.context.provider {
            ContextProvider::Mock => println!("🧠 Using MOCK context (use --real-context for the Anthropic API)"),
            ContextProvider::Anthropic => println!("🧠 Using {} for chunk context (this may take a while)", settings.context.model),
        }
    }

    let lexical = Arc::new(match settings.tantivy_dir() {
        Some(dir) => TantivyLexicalIndex::create_in_dir(&dir)?,
        None => TantivyLexicalIndex::create_in_ram()?,
    });
    let vector = Arc::new(
        LanceVectorIndex::create(&settings.lancedb_dir(), &settings.storage.collection, settings.embedding.dimension).await?,
    );

    let pipeline = IndexingPipeline::new(chunker, generator, Arc::clone(&embedder), Arc::clone(&lexical), Arc::clone(&vector))
        .with_progress(!quiet);
    let store = pipeline.run(&document).await?;

    let config = RetrieverConfig::from_settings(&settings.retrieval);
    let retriever = HybridRetriever::new(lexical, vector, embedder, config)?;
    if !quiet {
        println!(
            "✅ Indexed {} chunks; hybrid retriever ready ({:.0}% vector + {:.0}% BM25)",
            store.len(),
            config.vector_weight * 100.0,
            config.bm25_weight * 100.0
        );
    }

    let top_k = settings.retrieval.top_k;
    let use_contextual = settings.retrieval.use_contextual;
    match &cli.query {
        Some(query) => {
            let results = retriever.retrieve_with_space(query, top_k, use_contextual).await?;
            if cli.json {
                println!("{}", output::format_json(query, &results));
            } else {
                print!("{}", output::format_human(&results, cli.full_text));
            }
        }
        None => {
            let opts = session::SessionOptions { top_k, use_contextual, full_text: cli.full_text };
            let stdin = std::io::stdin();
            let mut stdout = std::io::stdout();
            session::run(&retriever, &store, &opts, BufReader::new(stdin.lock()), &mut stdout).await?;
        }
    }
    Ok(())
}
