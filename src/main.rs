//! # docqa CLI
//!
//! The `docqa` binary serves a document knowledge base over HTTP and
//! answers questions against it from the command line.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docqa serve` | Ingest the documents root, then start the HTTP server |
//! | `docqa ask "<question>"` | One-shot: ingest, answer, print sources |
//! | `docqa chat` | Interactive session with conversation history |
//! | `docqa scan` | Load and split documents, print counts, index nothing |
//!
//! ## Examples
//!
//! ```bash
//! # Serve the knowledge base on the configured address
//! docqa --config ./config/docqa.toml serve
//!
//! # Ask a single question
//! docqa ask "How do I deploy the billing service?"
//!
//! # Check what would be ingested
//! docqa scan
//! ```
//!
//! The index lives in process memory, so `serve`, `ask`, and `chat` ingest
//! the documents root at startup.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use docqa::agent::Agent;
use docqa::config::{load_config, Config};
use docqa::embedding::OpenAiEmbeddings;
use docqa::index::MemoryIndex;
use docqa::ingest;
use docqa::llm::create_adapter;
use docqa::loader::DocumentLoader;
use docqa::models::{ConversationTurn, Role};
use docqa::server::{run_server, AppState};
use docqa::splitter::TextSplitter;
use docqa::store::VectorStore;

#[derive(Parser)]
#[command(
    name = "docqa",
    about = "Retrieval-augmented question answering for local document knowledge bases",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest the documents root, then start the HTTP server.
    Serve,

    /// Ask a single question and print the answer with its sources.
    Ask {
        /// The question to answer.
        question: String,
    },

    /// Interactive question answering with conversation history.
    ///
    /// Type a question per line; `quit` or `exit` ends the session.
    Chat,

    /// Load and split the documents root without indexing, printing
    /// document and chunk counts.
    Scan,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docqa=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = if cli.config.exists() {
        load_config(&cli.config)?
    } else {
        // No config file: run on defaults (env API keys still apply).
        let config: Config = toml::from_str("").context("failed to build default config")?;
        docqa::config::validate(&config)?;
        config
    };

    match cli.command {
        Commands::Serve => serve(config).await,
        Commands::Ask { question } => ask(config, &question).await,
        Commands::Chat => chat(config).await,
        Commands::Scan => scan(config),
    }
}

/// Wire up the full pipeline: embedder, index, store, LLM adapter, agent.
fn build_state(config: Config) -> Result<AppState> {
    let config = Arc::new(config);

    let embedder = Arc::new(OpenAiEmbeddings::new(&config.embedding)?);
    let index = Arc::new(MemoryIndex::new());
    let store = Arc::new(VectorStore::new(embedder, index));

    let llm = create_adapter(&config.llm)?;
    let agent = Arc::new(Agent::new(
        store.clone(),
        llm,
        config.retrieval.top_k,
        &config.llm,
    ));

    let splitter = Arc::new(TextSplitter::from_config(&config.chunking)?);
    let loader = Arc::new(DocumentLoader::new(&config.documents.root));

    Ok(AppState {
        config,
        store,
        agent,
        splitter,
        loader,
    })
}

async fn serve(config: Config) -> Result<()> {
    let state = build_state(config)?;

    let report = ingest::reload(&state.store, &state.splitter, &state.loader).await?;
    info!(
        documents = report.document_count,
        chunks = report.chunk_count,
        "knowledge base ready"
    );

    run_server(state).await
}

async fn ask(config: Config, question: &str) -> Result<()> {
    let state = build_state(config)?;
    ingest::reload(&state.store, &state.splitter, &state.loader).await?;

    let result = state.agent.chat(question, None).await?;

    println!("{}\n", result.answer);
    if result.has_context {
        println!("Sources:");
        for doc in &result.retrieved_docs {
            match doc.distance {
                Some(d) => println!("  - {} (distance {:.4})", doc.metadata.filename, d),
                None => println!("  - {}", doc.metadata.filename),
            }
        }
    } else {
        println!("(answered from general knowledge, no matching documents)");
    }

    Ok(())
}

async fn chat(config: Config) -> Result<()> {
    let state = build_state(config)?;
    let report = ingest::reload(&state.store, &state.splitter, &state.loader).await?;

    if report.chunk_count == 0 {
        println!("Warning: the knowledge base is empty; answers will not be grounded.");
    } else {
        println!("Knowledge base ready: {} chunks indexed.", report.chunk_count);
    }
    println!("Type 'quit' or 'exit' to leave.\n");

    let mut history: Vec<ConversationTurn> = Vec::new();
    let stdin = std::io::stdin();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question == "quit" || question == "exit" {
            break;
        }

        let result = state.agent.chat(question, Some(&history)).await?;
        println!("{}\n", result.answer);

        history.push(ConversationTurn {
            role: Role::User,
            content: question.to_string(),
        });
        history.push(ConversationTurn {
            role: Role::Assistant,
            content: result.answer,
        });
    }

    Ok(())
}

fn scan(config: Config) -> Result<()> {
    let splitter = TextSplitter::from_config(&config.chunking)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let loader = DocumentLoader::new(&config.documents.root);

    let batch = loader.load_all();
    let chunks = splitter.split_documents(&batch.documents);

    println!("documents: {}", batch.documents.len());
    println!("chunks: {}", chunks.len());
    println!("skipped: {}", batch.skipped);
    for doc in &batch.documents {
        let count = chunks
            .iter()
            .filter(|c| c.metadata.source_path == doc.source_path)
            .count();
        println!("  {} -> {} chunks", doc.filename, count);
    }

    Ok(())
}
