//! activitycache - a command line client for shared activities.
//!
//! Lists upcoming activities grouped by day, and creates, edits, deletes and
//! joins them through the activities API. Every command builds one
//! `ActivityStore`, runs against it and renders the result.

mod commands;
mod render;

use std::io;
use std::path::Path;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use activitycache_core::Config;

use commands::Command;

// ============================================================================
// Constants
// ============================================================================

/// Log file written in the cache directory with --log-file
const LOG_FILE: &str = "activitycache.log";

#[derive(Parser)]
#[command(name = "activitycache", version, about = "Browse and join shared activities")]
struct Cli {
    /// Also write logs to the cache directory
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Command,
}

/// Initialize the tracing subscriber for logging.
/// Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::never(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let mut config = Config::load()?;
    let cache_dir = config.cache_dir()?;

    let log_dir = if cli.log_file {
        std::fs::create_dir_all(&cache_dir)?;
        Some(cache_dir.as_path())
    } else {
        None
    };
    let _guard = init_tracing(log_dir);
    info!(api = %config.api_base_url(), "activitycache starting");

    if let Err(e) = commands::run(cli.command, &mut config, cache_dir).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}
