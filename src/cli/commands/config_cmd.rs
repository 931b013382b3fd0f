//! config command - Show the effective configuration
//!
//! Tokens are reported only as present or absent.

use anyhow::Result;
use serde::Serialize;

use crate::cli::Context;
use crate::core::config::Config;
use crate::ui::output::{self, Verbosity};

/// Configuration after defaults are applied.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct EffectiveConfig {
    pub source: Option<String>,
    pub api_base: String,
    pub github_token_env: String,
    pub github_token_set: bool,
    pub bot_login: String,
    pub bot_organization: Option<String>,
    pub bot_token_env: String,
    pub bot_token_set: bool,
    pub page_size: u32,
    pub concurrency: usize,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub opt_out_label: String,
}

impl EffectiveConfig {
    pub fn from_config(config: &Config) -> Self {
        let bot = config.bot_identity();
        Self {
            source: config.loaded_from().map(|p| p.display().to_string()),
            api_base: config.api_base().to_string(),
            github_token_env: config.github_token_env().to_string(),
            github_token_set: config.github_token().is_some(),
            bot_login: bot.login,
            bot_organization: bot.organization,
            bot_token_env: config.bot_token_env().to_string(),
            bot_token_set: config.bot_token().is_some(),
            page_size: config.page_size(),
            concurrency: config.concurrency(),
            request_timeout_secs: config.request_timeout().as_secs(),
            max_retries: config.max_retries(),
            opt_out_label: config.opt_out_label().to_string(),
        }
    }

    fn lines(&self) -> Vec<String> {
        let presence = |set: bool| if set { "set" } else { "not set" };
        vec![
            format!(
                "source: {}",
                self.source.as_deref().unwrap_or("(defaults)")
            ),
            format!("github.api_base: {}", self.api_base),
            format!(
                "github.token_env: {} ({})",
                self.github_token_env,
                presence(self.github_token_set)
            ),
            format!("bot.login: {}", self.bot_login),
            format!(
                "bot.organization: {}",
                self.bot_organization.as_deref().unwrap_or("(none)")
            ),
            format!(
                "bot.token_env: {} ({})",
                self.bot_token_env,
                presence(self.bot_token_set)
            ),
            format!("sync.page_size: {}", self.page_size),
            format!("sync.concurrency: {}", self.concurrency),
            format!("sync.request_timeout_secs: {}", self.request_timeout_secs),
            format!("sync.max_retries: {}", self.max_retries),
            format!("sync.opt_out_label: {}", self.opt_out_label),
        ]
    }
}

/// Print the effective configuration.
pub fn config(ctx: &Context, config: &Config) -> Result<()> {
    let effective = EffectiveConfig::from_config(config);
    if ctx.json {
        output::json(&effective)?;
    } else {
        output::print(
            output::format_list(&effective.lines(), ""),
            Verbosity::from_flags(ctx.quiet, ctx.debug),
        );
    }
    Ok(())
}
