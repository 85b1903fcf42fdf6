// Docent CLI
//
// Design Decision: Use clap derive for ergonomic argument parsing.
// Design Decision: Support text/json/yaml output formats for scripting.
// Design Decision: One Docent context per process; Ctrl-C shuts it down.

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use docent_core::{
    build_http_client, telemetry, CapabilityRegistry, Docent, DocentConfig, DocentError,
};
use docent_openai::OpenAiAssistantsClient;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

#[derive(Parser)]
#[command(name = "docent")]
#[command(about = "Docent CLI - Knowledge-backed assistants with news and web lookups")]
#[command(version)]
pub struct Cli {
    /// Output format
    #[arg(long, short, default_value = "text", value_parser = ["text", "json", "yaml"])]
    pub output: String,

    /// Model used when creating assistants
    #[arg(long, env = "DOCENT_MODEL")]
    pub model: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload a document and remove the local copy
    Upload {
        /// Path of the document
        path: PathBuf,
    },

    /// Create a vector store and an assistant that searches it
    CreateAssistant {
        /// Assistant and vector store name
        #[arg(long)]
        title: String,

        /// Previously uploaded file id (repeatable)
        #[arg(long = "file")]
        files: Vec<String>,

        /// Document to upload first (repeatable)
        #[arg(long = "upload")]
        uploads: Vec<PathBuf>,
    },

    /// Ask the assistant a question and wait for its answer
    Ask {
        /// Prompt text
        prompt: String,

        /// Assistant ID
        #[arg(long, short)]
        assistant: String,

        /// Start a new thread on this vector store
        #[arg(long, conflicts_with = "thread", required_unless_present = "thread")]
        vector_store: Option<String>,

        /// Continue an existing thread
        #[arg(long, short)]
        thread: Option<String>,
    },

    /// Show the messages of a thread, oldest first
    History {
        /// Thread ID
        thread: String,
    },

    /// List the registered capabilities
    Tools,

    /// Run one capability locally with JSON arguments
    Call {
        /// Capability name
        name: String,

        /// Arguments as a JSON object
        #[arg(default_value = "{}")]
        arguments: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing("docent_core=info,docent_openai=info,docent=info");

    let cli = Cli::parse();
    let output = output::OutputFormat::from_str(&cli.output);

    let mut config = DocentConfig::from_env()?;
    if let Some(model) = cli.model {
        config = config.with_model(model);
    }

    match cli.command {
        Commands::Tools => {
            let registry = local_registry(&config)?;
            commands::capabilities::list(&registry, output)
        }
        Commands::Call { name, arguments } => {
            let registry = local_registry(&config)?;
            commands::capabilities::call(&registry, output, &name, &arguments).await
        }
        Commands::Upload { path } => {
            let docent = connect(config)?;
            until_shutdown(&docent, commands::knowledge::upload(&docent, output, &path)).await
        }
        Commands::CreateAssistant {
            title,
            files,
            uploads,
        } => {
            let docent = connect(config)?;
            until_shutdown(
                &docent,
                commands::knowledge::create_assistant(&docent, output, &title, files, uploads),
            )
            .await
        }
        Commands::Ask {
            prompt,
            assistant,
            vector_store,
            thread,
        } => {
            let target = match (thread, vector_store) {
                (Some(thread_id), _) => commands::conversation::Target::Thread { thread_id },
                (None, Some(vector_store_id)) => {
                    commands::conversation::Target::NewThread { vector_store_id }
                }
                (None, None) => anyhow::bail!("either --vector-store or --thread is required"),
            };
            let docent = connect(config)?;
            commands::conversation::ask(&docent, output, &assistant, target, &prompt).await
        }
        Commands::History { thread } => {
            let docent = connect(config)?;
            until_shutdown(&docent, commands::conversation::history(&docent, output, &thread)).await
        }
    }
}

fn local_registry(config: &DocentConfig) -> Result<CapabilityRegistry> {
    let registry = CapabilityRegistry::with_defaults(config, build_http_client(config)?);
    registry.validate()?;
    Ok(registry)
}

/// Build the process-wide context and wire Ctrl-C to its shutdown
fn connect(config: DocentConfig) -> Result<Arc<Docent>> {
    let api = Arc::new(OpenAiAssistantsClient::from_config(&config)?);
    let docent = Arc::new(Docent::init(config, api)?);

    let handle = docent.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling in-flight work (press Ctrl-C again to exit)");
            handle.shutdown();
        }
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });

    Ok(docent)
}

/// Abandon `command` once the context shuts down.
///
/// `ask` is not wrapped: its dispatcher watches the same token and cancels the
/// remote run before returning.
async fn until_shutdown<F>(docent: &Docent, command: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    let token = docent.shutdown_token();
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(DocentError::Cancelled.into()),
        result = command => result,
    }
}
