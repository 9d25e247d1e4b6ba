//! ledgerline - paginated ledger transfer ingestion
//!
//! Walks a block explorer's transfer listing page by page and streams
//! the records into a BigQuery table or local Parquet files.

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

mod cmd;
mod config;
mod signal;

use config::Config;

#[derive(Parser)]
#[command(name = "ledgerline")]
#[command(about = "Paginated ledger transfer ingestion")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "debug")]
    quiet: bool,

    /// Config file path (default: ./ledgerline.toml or ~/.config/ledgerline/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Maximum retry attempts for transient failures
    #[arg(long, global = true)]
    max_retries: Option<u32>,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest transfers into a warehouse table
    Ingest(Box<cmd::ingest::IngestArgs>),
    /// Show current configuration
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let progress = Arc::new(ledgerline_core::ProgressContext::new());

    // Logging:
    //   TTY:     warn unless --debug (the spinner shows activity)
    //   non-TTY: info unless --quiet/--debug (logs are the only progress)
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = cli.quiet || (is_tty && !cli.debug);
    ledgerline_core::init_logging(quiet, cli.debug, multi);

    let config = match &cli.config {
        Some(path) => Config::from_file(path),
        None => Config::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e:#}");
            return ExitCode::from(cmd::ingest::EXIT_CONFIG);
        }
    };

    // Config file defaults, CLI overrides
    let mut http = config.http.to_http_config();
    if let Some(secs) = cli.timeout {
        http.timeout = std::time::Duration::from_secs(secs);
    }
    if let Some(retries) = cli.max_retries {
        http.max_retries = retries;
    }
    ledgerline_core::set_http_config(http);

    match cli.command {
        Command::Ingest(args) => cmd::ingest::run(*args, &config, &progress),
        Command::Config => {
            cmd::show_config::run(&config);
            ExitCode::SUCCESS
        }
    }
}
