//! opt-out command - Check whether a repository declined automated pull requests

use anyhow::{Context as _, Result};
use serde::Serialize;

use crate::cli::Context;
use crate::core::config::Config;
use crate::core::types::RepoId;
use crate::engine::has_opted_out;
use crate::forge::Forges;
use crate::ui::output::{self, Verbosity};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OptOutStatus<'a> {
    repo: String,
    provider: &'a str,
    label: &'a str,
    opted_out: bool,
}

/// Report whether `repo` opted out.
pub fn opt_out(ctx: &Context, config: &Config, repo: &str, provider: &str) -> Result<()> {
    let repo = RepoId::parse(repo).context("Expected a repository as OWNER/REPO")?;
    let forges = Forges::from_config(config).context("Failed to set up provider clients")?;
    let label = config.opt_out_label();

    let rt = tokio::runtime::Runtime::new()?;
    let opted_out = rt.block_on(has_opted_out(&forges, provider, &repo, label))?;

    if ctx.json {
        output::json(&OptOutStatus {
            repo: repo.to_string(),
            provider,
            label,
            opted_out,
        })?;
    } else {
        let verb = if opted_out { "has" } else { "has not" };
        output::print(
            format!("{} {} opted out (label '{}')", repo, verb, label),
            Verbosity::from_flags(ctx.quiet, ctx.debug),
        );
    }
    Ok(())
}
