//! deckqa command-line entry point.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use deckqa::extract::extract;
use deckqa::server::{AppState, serve};
use deckqa::workflow::client::create_client;
use deckqa::workflow::engine::CandidateEngine;
use deckqa::workflow::engines::http::HttpEngine;
use deckqa::workflow::{ChatSession, RouterOutputAgent, RouterQueryPipeline, WorkflowConfig};

/// Description of the whole-document retrieval engine, shown to the
/// router.
const DOC_ENGINE_DESC: &str = "\
Synthesizes an answer to your question by feeding in an entire relevant document as context. \
Best used for higher-level summarization options.
Do NOT use if answer can be found in a specific chunk of a given document. \
Use the chunk engine instead for that purpose.

Each document represents a slide presentation produced by a consulting group.";

/// Description of the chunk-level retrieval engine, shown to the
/// router.
const CHUNK_ENGINE_DESC: &str = "\
Synthesizes an answer to your question by feeding in a relevant chunk as context. \
Best used for questions that are more pointed in nature.
Do NOT use if the question seems to require a general summary of any given document. \
Use the doc engine instead for that purpose.

Each document represents a slide presentation produced by a consulting group.";

#[derive(Parser)]
#[command(name = "deckqa", version, about = "Routed Q&A over a slide-deck corpus")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server.
    Serve {
        /// Listen address.
        #[arg(long, default_value = "127.0.0.1:8000")]
        addr: String,

        /// Endpoint of the whole-document retrieval engine.
        #[arg(long, env = "DECKQA_DOC_ENGINE")]
        doc_engine: String,

        /// Endpoint of the chunk-level retrieval engine.
        #[arg(long, env = "DECKQA_CHUNK_ENGINE")]
        chunk_engine: String,
    },

    /// Answer one message from the command line.
    Query {
        /// The question to answer.
        message: String,

        /// Endpoint of the whole-document retrieval engine.
        #[arg(long, env = "DECKQA_DOC_ENGINE")]
        doc_engine: String,

        /// Endpoint of the chunk-level retrieval engine.
        #[arg(long, env = "DECKQA_CHUNK_ENGINE")]
        chunk_engine: String,
    },

    /// Extract structured citations from an envelope read from stdin.
    Extract,
}

fn build_agent(doc_engine: &str, chunk_engine: &str) -> anyhow::Result<Arc<RouterOutputAgent>> {
    let config = WorkflowConfig::from_env().context("loading workflow configuration")?;
    let llm = create_client(&config).context("creating LLM client")?;

    let engines: Vec<Arc<dyn CandidateEngine>> = vec![
        Arc::new(HttpEngine::new(doc_engine, DOC_ENGINE_DESC)),
        Arc::new(HttpEngine::new(chunk_engine, CHUNK_ENGINE_DESC)),
    ];

    let pipeline = Arc::new(RouterQueryPipeline::new(
        engines,
        Arc::clone(&llm),
        config.router_timeout,
    ));

    Ok(Arc::new(RouterOutputAgent::new(
        llm,
        pipeline,
        config.agent_timeout,
    )))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("deckqa=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            addr,
            doc_engine,
            chunk_engine,
        } => {
            let agent = build_agent(&doc_engine, &chunk_engine)?;
            serve(AppState::new(agent), &addr).await
        }

        Command::Query {
            message,
            doc_engine,
            chunk_engine,
        } => {
            let agent = build_agent(&doc_engine, &chunk_engine)?;
            let mut session = ChatSession::new();
            let outcome = agent.run(&mut session, &message).await?;
            let output = extract(&outcome.text);
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }

        Command::Extract => {
            let input = std::io::read_to_string(std::io::stdin()).context("reading stdin")?;
            let output = extract(&input);
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
    }
}
