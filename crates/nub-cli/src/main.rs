//! # Nub CLI
//!
//! Command-line front-end for the snippet worker. Assembles a snippet from
//! a local file, runs one RPC call through the message broker, and prints
//! the link the worker hands back.
//!
//! Broker connection parameters come from the environment (`RABBITMQ_*`);
//! everything else is a flag.

mod assembler;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use nub_rpc::{BrokerConfig, SnippetRpcClient};
use nub_types::RetentionPeriod;

/// Create a snippet of file lines with a specified lifetime.
#[derive(Parser, Debug)]
#[command(name = "nub", version)]
#[command(about = "Create a snippet of file lines with a specified lifetime")]
struct Args {
    /// Path to the file
    #[arg(long)]
    file: PathBuf,

    /// Number of days to keep the snippet
    #[arg(long, default_value_t = 0)]
    days: i64,

    /// Number of hours to keep the snippet
    #[arg(long, default_value_t = 0)]
    hours: i64,

    /// Number of minutes to keep the snippet
    #[arg(long, default_value_t = 0)]
    minutes: i64,

    /// Deadline for the whole exchange, in seconds
    #[arg(long, default_value_t = 5)]
    timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: Level,
}

/// Install the log subscriber for the level carried by the parsed arguments.
///
/// The level is an explicit input rather than ambient process state; the
/// subscriber installation is the only global effect.
fn init_logging(level: Level) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Render `url` as an OSC-8 terminal hyperlink.
fn hyperlink(url: &str) -> String {
    format!("\x1b]8;;{url}\x1b\\{url}\x1b]8;;\x1b\\")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_level)?;

    let retention = RetentionPeriod::new(args.days, args.hours, args.minutes);
    let snippet = assembler::assemble(&args.file, retention)
        .with_context(|| format!("Failed to assemble snippet from {}", args.file.display()))?;

    let client = SnippetRpcClient::new(BrokerConfig::from_env())
        .with_timeout(Duration::from_secs(args.timeout_secs));

    info!("Requesting a snippet link");

    let link = client
        .call(&snippet)
        .await
        .context("RPC call against the snippet worker failed")?;

    info!("Here you go: {}", hyperlink(&link));

    Ok(())
}
