//! api-shield command line.
//!
//! # Architecture Overview
//!
//! ```text
//!     render / fetch
//!          │
//!          ▼
//!     ┌──────────┐  hit   ┌─────────────────────────────────────────────┐
//!     │  cache   │──────▶ │ result                                      │
//!     └────┬─────┘        └─────────────────────────────────────────────┘
//!          │ miss
//!          ▼
//!     ┌──────────┐  open  ┌─────────────────────────────────────────────┐
//!     │ breaker  │──────▶ │ CircuitOpen (no network)                    │
//!     └────┬─────┘        └─────────────────────────────────────────────┘
//!          ▼
//!     ┌──────────┐   ┌─────────┐   ┌─────────────┐   ┌──────────────────┐
//!     │  queue   │──▶│ breaker │──▶│ retry loop  │──▶│ HTTP (deadline)  │
//!     └──────────┘   └─────────┘   └─────────────┘   └──────────────────┘
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use api_shield::config::{read_config, validate_config, ShieldConfig};
use api_shield::lifecycle::{self, signals};
use api_shield::observability::{logging, metrics};
use api_shield::services::RenderMode;

#[derive(Parser)]
#[command(name = "api-shield")]
#[command(about = "Call rate-limited remote APIs through breakers, queues and caches", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print circuit status as JSON after the command
    #[arg(long)]
    status: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a markdown file to HTML
    Render {
        file: PathBuf,
        #[arg(long, default_value_t = RenderMode::Gfm)]
        mode: RenderMode,
        /// Repository (owner/name) for gfm reference links
        #[arg(long)]
        context: Option<String>,
    },
    /// Download a file from the file store
    Fetch {
        path: String,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate the configuration and exit
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        // Validation happens below (check-config) or in `lifecycle::build`.
        Some(path) => read_config(path)?,
        None => ShieldConfig::default(),
    };

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "api-shield starting");

    if let Commands::CheckConfig = cli.command {
        return match validate_config(&config) {
            Ok(()) => {
                println!("configuration ok");
                Ok(())
            }
            Err(errors) => {
                for e in &errors {
                    eprintln!("{e}");
                }
                Err(format!("{} configuration error(s)", errors.len()).into())
            }
        };
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shield = lifecycle::build(config)?;

    let outcome = tokio::select! {
        outcome = run(&shield, cli.command) => outcome,
        _ = signals::wait_for_ctrl_c() => Err("interrupted".into()),
    };

    if cli.status {
        println!("{}", serde_json::to_string_pretty(&shield.statuses())?);
    }
    shield.shutdown();
    tracing::info!("Shutdown complete");
    outcome
}

async fn run(
    shield: &lifecycle::Shield,
    command: Commands,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Render {
            file,
            mode,
            context,
        } => {
            let text = tokio::fs::read_to_string(&file).await?;
            match shield
                .markdown
                .render_with(&text, mode, context.as_deref())
                .await
            {
                Ok(html) => println!("{html}"),
                Err(e) => {
                    eprintln!("{}", e.user_message());
                    return Err(e.into());
                }
            }
        }
        Commands::Fetch { path, output } => {
            let bytes = match shield.files.load_file(&path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    eprintln!("{}", e.user_message());
                    return Err(e.into());
                }
            };
            match output {
                Some(out) => {
                    tokio::fs::write(&out, &bytes).await?;
                    tracing::info!(path = %out.display(), bytes = bytes.len(), "File written");
                }
                None => {
                    use std::io::Write;
                    std::io::stdout().write_all(&bytes)?;
                }
            }
        }
        Commands::CheckConfig => {}
    }
    Ok(())
}
