//! fastnav — headless driver for the navigation engine.

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

mod cli;

#[derive(Parser)]
#[command(
    name = "fastnav",
    about = "fastnav — drive the fast-navigation engine against a live site",
    version,
    after_help = "Run 'fastnav <command> --help' for details on each command."
)]
struct Cli {
    /// Output results as JSON lines (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Path to a JSON engine config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a start page, then navigate through paths in place
    Browse {
        /// Absolute URL of the landing page
        start: String,
        /// Links to follow in order (relative or absolute)
        paths: Vec<String>,
        /// Go back this many history entries at the end
        #[arg(long, default_value = "0")]
        back: usize,
        /// Skip startup prefetching of visible links
        #[arg(long)]
        no_prefetch: bool,
        /// Persist theme/diary state in this JSON file
        #[arg(long)]
        state: Option<PathBuf>,
    },
    /// Print the title and main-content fragment of a page
    Extract {
        /// File path or http(s) URL
        source: String,
        /// Main-content selector (defaults to the config value)
        #[arg(long)]
        selector: Option<String>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish)
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = fastnav::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Browse {
            start,
            paths,
            back,
            no_prefetch,
            state,
        } => {
            let opts = cli::browse_cmd::BrowseOptions {
                start,
                paths,
                back,
                prefetch: !no_prefetch,
                state,
                json: cli.json,
            };
            cli::browse_cmd::run(config, opts).await
        }
        Commands::Extract { source, selector } => {
            let selector = selector.unwrap_or_else(|| config.content_selector.clone());
            cli::extract_cmd::run(&config, &source, &selector, cli.json).await
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "fastnav", &mut std::io::stdout());
            Ok(())
        }
    }
}
