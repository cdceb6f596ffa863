use anyhow::Result;
use clap::{Parser, Subcommand};

use propchat::cli::{ask, build, query, show};
use propchat::config::Config;
use propchat::pipeline::AppContext;

#[derive(Parser)]
#[command(name = "propchat")]
#[command(about = "Design-model property extraction and chat session backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "propchat.yaml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch model metadata and build the property database
    Build {
        /// Model URN
        model_id: String,

        /// Bearer token (falls back to PROPCHAT_ACCESS_TOKEN)
        #[arg(long)]
        token: Option<String>,
    },

    /// Ask the chatbot one question about a model
    Ask {
        /// Model URN
        model_id: String,

        /// Prompt text
        prompt: String,

        /// Bearer token (falls back to PROPCHAT_ACCESS_TOKEN)
        #[arg(long)]
        token: Option<String>,
    },

    /// Run a read-only SQL query against a built property database
    Query {
        /// Model URN
        model_id: String,

        /// SQL text
        sql: String,
    },

    /// Show cached artifacts for a model
    Show {
        /// Model URN
        model_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // Load config
    let config = Config::load(&cli.config).unwrap_or_default();

    match cli.command {
        Commands::Build { model_id, token } => {
            build::run(&config, &model_id, token).await?;
        }
        Commands::Ask {
            model_id,
            prompt,
            token,
        } => {
            let ctx = AppContext::new(config, ask::sql_direct_factory());
            ask::run(&ctx, &model_id, &prompt, token).await?;
        }
        Commands::Query { model_id, sql } => {
            query::run(&config, &model_id, &sql)?;
        }
        Commands::Show { model_id } => {
            show::run(&config, &model_id)?;
        }
    }

    Ok(())
}
