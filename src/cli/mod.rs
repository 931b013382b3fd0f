//! cli
//!
//! Command-line interface layer for Backstroke.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Install the tracing subscriber
//! - Load configuration and delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and hands links to
//! the [`crate::engine`]. Logs go to stderr; stdout carries only command
//! output so `--json` results can be piped.

pub mod args;
pub mod commands;

pub use args::{Cli, Command, Shell};

use anyhow::{Context as _, Result};
use tracing_subscriber::EnvFilter;

use crate::core::config::Config;

/// Output settings shared by all commands.
#[derive(Debug, Clone, Copy, Default)]
pub struct Context {
    pub debug: bool,
    pub quiet: bool,
    pub json: bool,
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.log_filter());

    let ctx = Context {
        debug: cli.debug,
        quiet: cli.quiet,
        json: cli.json,
    };

    if let Command::Completion { shell } = cli.command {
        return commands::completion(shell);
    }

    let config = Config::load().context("Failed to load configuration")?;
    commands::dispatch(cli.command, &ctx, &config)
}

/// Log to stderr. `RUST_LOG` overrides the flag-derived default.
fn init_tracing(default_filter: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // A second install (e.g. in tests) is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
