//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Validates command-specific arguments
//! 2. Calls the engine
//! 3. Formats and displays output
//!
//! # Async Commands
//!
//! Commands that reach a provider (`run`, `opt-out`) are async because they
//! involve network I/O. Their handlers build a tokio runtime and block on
//! the async implementation.

mod completion;
mod config_cmd;
mod opt_out;
mod run;

pub use completion::completion;
pub use config_cmd::{config, EffectiveConfig};
pub use opt_out::opt_out;
pub use run::{read_link, run};

use anyhow::Result;

use super::{Command, Context};
use crate::core::config::Config;

/// Dispatch a parsed command to its handler.
pub fn dispatch(command: Command, ctx: &Context, config: &Config) -> Result<()> {
    match command {
        Command::Run {
            link,
            page_size,
            concurrency,
        } => run(
            ctx,
            config,
            &link,
            page_size,
            concurrency.map(|c| c as usize),
        ),
        Command::OptOut { repo, provider } => opt_out(ctx, config, &repo, &provider),
        Command::Config => config_cmd::config(ctx, config),
        Command::Completion { shell } => completion(shell),
    }
}
