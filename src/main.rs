//! Pushwire CLI - receive Pushover notifications on the command line.
//!
//! This is the main binary entry point. See the `pushwire` library for the
//! core functionality.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use pushwire::{commands, Config, OutputFormat};

/// Global allocator configured per M-MIMALLOC-APPS guideline.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[command(name = "pushwire")]
#[command(version)]
#[command(about = "Receive Pushover notifications over the Open Client push socket")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and register this machine as a Pushover device
    Init,
    /// Listen for messages and print them to stdout
    Listen {
        /// Output format (defaults to the configured format)
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
        /// Template for `--format template`, e.g. "{{.Title}}: {{.Message}}\n"
        #[arg(long)]
        template: Option<String>,
    },
}

/// Install the logger. Logs go to stderr, or to `PUSHWIRE_LOG_FILE` when set,
/// so stdout carries only message output.
fn init_logging() -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.format_timestamp_secs();

    if let Ok(path) = std::env::var("PUSHWIRE_LOG_FILE") {
        let log_file = std::fs::File::create(&path)
            .with_context(|| format!("Failed to create log file at {path}"))?;
        builder.target(env_logger::Target::Pipe(Box::new(log_file)));
    } else {
        builder.target(env_logger::Target::Stderr);
    }

    builder.init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let cli = Cli::parse();
    let config = Config::load()?;
    log::debug!(
        "Starting pushwire v{} ({})",
        env!("CARGO_PKG_VERSION"),
        pushwire::env::Environment::current()
    );

    match cli.command {
        Commands::Init => commands::init::run(&config).await,
        Commands::Listen { format, template } => {
            commands::listen::run(&config, format, template).await
        }
    }
}
