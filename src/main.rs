//! callguard: guarded local model invocation.
//!
//! # Architecture Overview
//!
//! ```text
//!   CLI (probe | invoke | config)
//!        │
//!        ▼
//!   ┌──────────────────────────── App ─────────────────────────────┐
//!   │                                                               │
//!   │   resolve_base_url                    inference               │
//!   │   ┌───────────────┐                   ┌───────────────┐       │
//!   │   │ probe breaker │                   │ model breaker │       │
//!   │   │  └ timeout    │                   │  └ timeout    │       │
//!   │   │     └ probe   │── base URL ──────▶│     └ client  │──────▶│── Ollama
//!   │   └───────────────┘                   └───────────────┘       │
//!   │                                                               │
//!   │   config · logging (tracing) · metrics (prometheus)          │
//!   └───────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use callguard::config;
use callguard::observability::{logging, metrics};
use callguard::App;

#[derive(Parser)]
#[command(name = "callguard")]
#[command(about = "Guarded calls to a local model server", long_about = None)]
struct Cli {
    /// Path to a TOML config file (defaults to ./callguard.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look for a model server on the configured local port
    Probe,
    /// Send a prompt through the guarded model client
    Invoke(InvokeArgs),
    /// Print the effective configuration
    Config,
}

#[derive(Args)]
struct InvokeArgs {
    #[arg(short, long, conflicts_with = "prompt_file", required_unless_present = "prompt_file")]
    prompt: Option<String>,

    #[arg(long)]
    prompt_file: Option<PathBuf>,

    /// Send the prompt this many times, sharing one breaker
    #[arg(short, long, default_value_t = 1)]
    repeat: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let config = config::load(cli.config.as_deref())?;

    logging::init_logging(&config.observability)?;

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    match cli.command {
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
        }
        Commands::Probe => {
            let app = App::new(config)?;
            match app.detect_local_service().await {
                Ok(Some(url)) => println!("{}", url),
                Ok(None) => println!("no local service detected"),
                Err(e) => println!("probe failed: {}", e),
            }
        }
        Commands::Invoke(args) => {
            let prompt = match (args.prompt, args.prompt_file) {
                (Some(prompt), _) => prompt,
                (None, Some(path)) => std::fs::read_to_string(path)?,
                (None, None) => return Err("one of --prompt or --prompt-file is required".into()),
            };

            let app = App::new(config)?;
            let base_url = app.resolve_base_url().await;
            tracing::info!(base_url = %base_url, repeat = args.repeat, "Invoking model");

            let inference = app.inference(base_url);
            for _ in 0..args.repeat {
                let line = match inference.call(prompt.clone()).await {
                    Ok(text) => text,
                    Err(e) => callguard::fallback_message(&e),
                };
                println!("{}", line);
            }

            let snapshot = app.model_breaker().snapshot();
            eprintln!(
                "model circuit: {} ({} consecutive failures)",
                snapshot.state, snapshot.consecutive_failures
            );
        }
    }

    Ok(())
}
