//! oarlog - Club rowing logbook
//!
//! This is the main entry point for the oarlog command line.
//! It wires together all the components:
//! - Configuration loading
//! - Store initialization
//! - Level policy
//! - Start/stop session engine

mod commands;

use anyhow::{Context, Result, bail};
use clap::Parser;
use oarlog_config::{load_config, ClubPolicy};
use oarlog_core::LevelPolicyStore;
use oarlog_store::SqliteStore;
use oarlog_util::{default_config_path, is_mock_time_active, DATABASE_FILENAME, OARLOG_DATA_DIR_ENV};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::commands::{App, Command};

/// oarlog - Club rowing logbook with boat level policy
#[derive(Parser, Debug)]
#[command(name = "oarlog")]
#[command(about = "Club rowing logbook with boat level policy", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/oarlog/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override (or set OARLOG_DATA_DIR env var)
    #[arg(short, long, env = OARLOG_DATA_DIR_ENV)]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

/// Load the club policy, falling back to defaults when no file exists
fn load_policy(path: &Path) -> Result<ClubPolicy> {
    if !path.exists() {
        info!(config_path = %path.display(), "No configuration file, using defaults");
        return Ok(ClubPolicy::default());
    }

    let policy = load_config(path)
        .with_context(|| format!("Failed to load config from {:?}", path))?;

    info!(config_path = %path.display(), "Configuration loaded");
    Ok(policy)
}

fn open_app(args: &Args) -> Result<App> {
    let policy = load_policy(&args.config)?;

    let data_dir = args
        .data_dir
        .clone()
        .unwrap_or_else(|| policy.storage.data_dir.clone());

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

    let db_path = data_dir.join(DATABASE_FILENAME);
    let store = Arc::new(
        SqliteStore::open(&db_path)
            .with_context(|| format!("Failed to open database {:?}", db_path))?,
    );

    if !store.is_healthy() {
        bail!("Database {:?} does not answer queries", db_path);
    }

    info!(db_path = %db_path.display(), "Store initialized");

    let levels = Arc::new(
        LevelPolicyStore::from_policy(&policy, store.clone())
            .context("Failed to load level policy")?,
    );

    Ok(App::new(store, levels))
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Logs go to stderr so command output stays clean
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    if args.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "oarlog starting");

    if is_mock_time_active() {
        warn!("Mock time is active, timestamps are shifted");
    }

    let app = open_app(&args)?;
    app.run(args.command)
}
