//! op-secure-notes-mcp: MCP server for 1Password secure notes
//!
//! Serves the secure note tools over stdio. Logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use op_secure_notes_mcp::catalog::Catalog;
use op_secure_notes_mcp::config;
use op_secure_notes_mcp::mcp::{McpServer, StdioTransport};
use op_secure_notes_mcp::vault::OpCli;

/// MCP server for managing 1Password secure notes.
///
/// Lists, reads, creates, appends to, replaces and archives secure notes in
/// one vault through the 1Password CLI (`op`).
#[derive(Parser, Debug)]
#[command(name = "op-secure-notes-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Vault holding the secure notes (overrides OP_VAULT)
    #[arg(long, value_name = "NAME")]
    vault: Option<String>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN,
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber. Stdout carries protocol traffic, so
/// logs go to stderr.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Entry point for the op-secure-notes-mcp server.
fn main() -> ExitCode {
    let args = Args::parse();

    let config_path = args.config.as_deref();
    let mut cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if config_path.is_none() {
                if let Some(default_path) = config::default_config_path() {
                    eprintln!("\nDefault config path: {}", default_path.display());
                }
            }
            return ExitCode::FAILURE;
        }
    };
    cfg.apply_env(|key| std::env::var(key).ok());
    if args.vault.is_some() {
        cfg.set_vault(args.vault);
    }

    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting op-secure-notes-mcp server"
    );

    match cfg.vault.as_deref() {
        Some(vault) => info!(vault, "Target vault configured"),
        None => warn!("No vault configured; only op-version will succeed until OP_VAULT is set"),
    }

    let store = OpCli::from_config(&cfg.op);
    info!(binary = %store.binary().display(), "Using 1Password CLI");

    let catalog = match Catalog::with_secure_note_tools(cfg.vault, store) {
        Ok(catalog) => catalog,
        Err(e) => {
            error!(error = %e, "Failed to build tool catalog");
            return ExitCode::FAILURE;
        }
    };

    let mut server = McpServer::new(catalog);

    info!("MCP server ready, waiting for client connection...");

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(server.run(StdioTransport::stdio())) {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}
