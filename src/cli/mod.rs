pub mod compare;
pub mod generate;
pub mod history;
pub mod providers;
pub mod stats;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::core::config::GatewayConfig;
use crate::core::gateway::Gateway;
use crate::core::history::JsonFileStore;
use crate::core::registry::ProviderRegistry;
use crate::providers::ProviderKind;

#[derive(Parser)]
#[command(name = "prism")]
#[command(about = "LLM gateway: one prompt, many providers, side-by-side")]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to prism.toml (default: search upwards from the working directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a completion from one provider
    Generate {
        /// Prompt text
        prompt: String,

        /// Provider to use
        #[arg(short, long, default_value = "openai")]
        provider: ProviderKind,

        /// Model name (default: the provider's default model)
        #[arg(short, long)]
        model: Option<String>,

        /// System message
        #[arg(short, long)]
        system: Option<String>,

        /// Maximum tokens to generate
        #[arg(long)]
        max_tokens: Option<u32>,

        /// Sampling temperature
        #[arg(short, long)]
        temperature: Option<f32>,

        /// Print the response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Send one prompt to several providers concurrently
    Compare {
        /// Prompt text
        prompt: String,

        /// Comma-separated providers to compare
        #[arg(short, long, value_delimiter = ',', default_value = "openai,gemini")]
        providers: Vec<ProviderKind>,

        /// Maximum tokens to generate per provider
        #[arg(long)]
        max_tokens: Option<u32>,

        /// Sampling temperature
        #[arg(short, long)]
        temperature: Option<f32>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List every provider and whether it is available
    Providers {
        /// Print descriptors as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show recent generations
    History {
        /// Maximum number of records to show (default 50)
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Only show this provider
        #[arg(short, long)]
        provider: Option<ProviderKind>,

        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show token and duration statistics
    Stats {
        /// Only count this provider
        #[arg(short, long)]
        provider: Option<ProviderKind>,

        /// Only count the last N days
        #[arg(long)]
        days: Option<u32>,

        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = GatewayConfig::load(self.config.as_deref())?;
        init_tracing(&config.logging.level, self.verbose);
        debug!(storage = %config.storage.dir.display(), "configuration loaded");

        let registry = Arc::new(ProviderRegistry::from_config(&config)?);
        let store = Arc::new(JsonFileStore::new(config.storage.dir.clone()));
        let gateway = Gateway::new(registry, store);

        let cancel = CancellationToken::new();
        let watcher = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, cancelling in-flight requests");
                watcher.cancel();
            }
        });

        match self.command {
            Commands::Generate {
                prompt,
                provider,
                model,
                system,
                max_tokens,
                temperature,
                json,
            } => {
                let args = generate::Args {
                    prompt,
                    provider,
                    model,
                    system,
                    max_tokens,
                    temperature,
                };
                generate::run(&gateway, &cancel, args, json).await
            }
            Commands::Compare {
                prompt,
                providers,
                max_tokens,
                temperature,
                json,
            } => compare::run(&gateway, &cancel, prompt, providers, max_tokens, temperature, json).await,
            Commands::Providers { json } => providers::run(&gateway, json).await,
            Commands::History {
                limit,
                provider,
                json,
            } => history::run(&gateway, limit, provider, json).await,
            Commands::Stats {
                provider,
                days,
                json,
            } => stats::run(&gateway, provider, days, json).await,
        }
    }
}

/// `--verbose` forces debug; otherwise `RUST_LOG`, then the configured level.
fn init_tracing(level: &str, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // Already installed when the CLI is driven more than once in-process.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
