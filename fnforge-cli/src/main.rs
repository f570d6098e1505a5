//! fnforge CLI - synthesize, check and run candidate functions

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{cache, check, run, synth};

#[derive(Parser)]
#[command(name = "fnforge")]
#[command(about = "Synthesize pure functions from descriptions and examples", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize a function from a request file
    Synth {
        /// JSON file with description, testCases and iterations
        #[arg(long)]
        request: PathBuf,

        /// Override the iteration budget
        #[arg(long)]
        iterations: Option<u32>,

        /// Call the oracle without the response cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Print the purity verdict for a candidate file
    Check {
        /// Candidate source file
        file: PathBuf,
    },

    /// Run a candidate on one input
    Run {
        /// Candidate source file
        file: PathBuf,

        /// Input as JSON
        #[arg(long)]
        input: String,
    },

    /// Inspect or clear the response cache
    #[command(subcommand)]
    Cache(CacheCommands),
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Show entry count of a namespace
    Stats {
        /// Cache namespace (defaults to the configured one)
        #[arg(long)]
        namespace: Option<String>,
    },

    /// Remove every entry of a namespace
    Clear {
        /// Cache namespace (defaults to the configured one)
        #[arg(long)]
        namespace: Option<String>,
    },
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.debug);

    // Load configuration
    let config = fnforge_synth::load_config(cli.config)?;

    match cli.command {
        Commands::Synth {
            request,
            iterations,
            no_cache,
        } => {
            synth::synthesize_file(&request, iterations, no_cache, &config).await?;
        }

        Commands::Check { file } => {
            check::check_file(&file)?;
        }

        Commands::Run { file, input } => {
            run::run_file(&file, &input, &config)?;
        }

        Commands::Cache(CacheCommands::Stats { namespace }) => {
            cache::stats(namespace, &config).await?;
        }

        Commands::Cache(CacheCommands::Clear { namespace }) => {
            cache::clear(namespace, &config).await?;
        }
    }

    Ok(())
}
