//! Trace recorder entry point

use anyhow::Context;
use clap::{Parser, Subcommand};
use codec::SessionSelector;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trace_recorder::{dump_requests, summarize, RecorderConfig, TraceService};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record everything published on the process bus until interrupted
    Record {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output trace file, overrides the configuration
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Throughput window in milliseconds, overrides the configuration
        #[arg(long)]
        window_ms: Option<u64>,

        /// Stop after this many seconds instead of waiting for Ctrl+C
        #[arg(long)]
        duration_secs: Option<u64>,
    },

    /// Print the header and event statistics of a trace file
    Inspect {
        file: PathBuf,

        /// Emit the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the replayable requests of a trace file as JSON lines
    Requests {
        file: PathBuf,

        /// Only this session (decimal or 0x-prefixed hex)
        #[arg(long, conflicts_with = "first")]
        session: Option<SessionSelector>,

        /// Only the session that issued the first request
        #[arg(long)]
        first: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trace_recorder=info,actors=info,codec=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match Args::parse().command {
        Command::Record {
            config,
            output,
            window_ms,
            duration_secs,
        } => {
            let mut config = match config {
                Some(path) => RecorderConfig::load(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => RecorderConfig::default(),
            };
            if let Some(output) = output {
                config.output = output;
            }
            if let Some(window_ms) = window_ms {
                config.throughput_window_ms = window_ms;
            }
            record(config, duration_secs.map(Duration::from_secs)).await
        }
        Command::Inspect { file, json } => {
            let summary =
                summarize(&file).with_context(|| format!("reading {}", file.display()))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{summary}");
            }
            Ok(())
        }
        Command::Requests {
            file,
            session,
            first,
        } => {
            let selector = match (session, first) {
                (_, true) => SessionSelector::First,
                (Some(selector), false) => selector,
                (None, false) => SessionSelector::All,
            };
            let written = dump_requests(&file, selector, std::io::stdout().lock())
                .with_context(|| format!("reading {}", file.display()))?;
            info!(requests = written, selector = %selector, "Requests extracted");
            Ok(())
        }
    }
}

async fn record(config: RecorderConfig, duration: Option<Duration>) -> anyhow::Result<()> {
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded: {:?}", config);

    let service = TraceService::start(&config, actors::TraceEventBus::global())
        .context("starting trace service")?;

    let shutdown_signal = async {
        match duration {
            Some(duration) => tokio::time::sleep(duration).await,
            None => {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                }
            }
        }
    };
    shutdown_signal.await;
    info!("Shutdown signal received");

    service.shutdown();
    Ok(())
}
