//! cli::commands::run
//!
//! Synchronize one link.
//!
//! # Design
//!
//! The link is read from a JSON file (or stdin with `-`), provider clients
//! are built from configuration and environment tokens, and the dispatcher
//! runs the link. Ctrl-C cancels the run: no further provider calls are
//! started and in-flight synchronizations finish.
//!
//! # Example
//!
//! ```bash
//! backstroke run --link link.json
//! backstroke run --link link.json --page-size 50 --concurrency 4 --json
//! ```

use std::io::Read;
use std::path::Path;

use anyhow::{Context as _, Result};
use tokio_util::sync::CancellationToken;

use crate::cli::Context;
use crate::core::config::Config;
use crate::core::types::Link;
use crate::engine::{Dispatcher, SyncOptions};
use crate::forge::Forges;
use crate::ui::output::{self, Verbosity};

/// Run the run command.
///
/// This is a synchronous wrapper that uses tokio to run the async implementation.
pub fn run(
    ctx: &Context,
    config: &Config,
    link_path: &Path,
    page_size: Option<u32>,
    concurrency: Option<usize>,
) -> Result<()> {
    let link = read_link(link_path)?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_async(ctx, config, &link, page_size, concurrency))
}

/// Read a link definition from `path`, or stdin for `-`.
pub fn read_link(path: &Path) -> Result<Link> {
    let contents = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read link from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read link file '{}'", path.display()))?
    };

    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse link '{}'", path.display()))
}

async fn run_async(
    ctx: &Context,
    config: &Config,
    link: &Link,
    page_size: Option<u32>,
    concurrency: Option<usize>,
) -> Result<()> {
    let forges = Forges::from_config(config).context("Failed to set up provider clients")?;

    let mut options = SyncOptions::from_config(config);
    if let Some(page_size) = page_size {
        options.page_size = page_size;
    }
    if let Some(concurrency) = concurrency {
        options.concurrency = concurrency;
    }

    let dispatcher = Dispatcher::new(forges, config.bot_identity(), options);

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, letting in-flight synchronizations finish");
                cancel.cancel();
            }
        })
    };

    let result = dispatcher.run(link, &cancel).await;
    interrupt.abort();
    let report = result?;

    if ctx.json {
        output::json(&report)?;
    } else {
        output::print(
            output::format_report(&report),
            Verbosity::from_flags(ctx.quiet, ctx.debug),
        );
    }
    Ok(())
}
