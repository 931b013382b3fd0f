//! engine::dispatch
//!
//! Top-level entry point: decide what a link asks for and route it.
//!
//! # Fail-closed checks
//!
//! Every check below runs before the first provider call:
//! 1. disabled link: skipped report, `isEnabled: false`
//! 2. missing `from` or `to`: skipped report naming the missing side
//! 3. unknown target type: `SyncError::UnsupportedTargetType`
//! 4. underivable identity or branch: `SyncError::InvalidRepository`
//! 5. unsupported or unconfigured provider: configuration error
//!
//! Only then is the single-target or fan-out path taken.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::core::config::{Config, DEFAULT_CONCURRENCY, DEFAULT_OPT_OUT_LABEL, DEFAULT_PAGE_SIZE};
use crate::core::types::{BotIdentity, Link, RepoRef, TargetKind};
use crate::forge::{ForgeClients, Forges};

use super::forks::ForkEnumerator;
use super::pull_request::{Endpoint, Synchronizer};
use super::{SyncError, SyncReport};

/// Tuning for synchronization runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Forks requested per page.
    pub page_size: u32,
    /// Concurrent per-fork synchronizations within a page.
    pub concurrency: usize,
    /// Label marking a repository as opted out.
    pub opt_out_label: String,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            opt_out_label: DEFAULT_OPT_OUT_LABEL.to_string(),
        }
    }
}

impl SyncOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            page_size: config.page_size(),
            concurrency: config.concurrency(),
            opt_out_label: config.opt_out_label().to_string(),
        }
    }
}

/// A validated link, ready to run.
struct Plan {
    from: Endpoint,
    source: ForgeClients,
    target: ForgeClients,
    route: Route,
}

enum Route {
    Single(Endpoint),
    FanOut(RepoRef),
}

/// Routes links to the synchronizer or the fork enumerator.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    forges: Forges,
    bot: BotIdentity,
    options: SyncOptions,
}

impl Dispatcher {
    pub fn new(forges: Forges, bot: BotIdentity, options: SyncOptions) -> Self {
        Self {
            forges,
            bot,
            options,
        }
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Run a link to completion.
    ///
    /// Disabled and incomplete links produce a skipped report, not an
    /// error. Cancelling `cancel` stops further provider calls; calls in
    /// flight finish.
    ///
    /// # Errors
    ///
    /// - configuration errors (see [`SyncError::is_configuration`]),
    ///   always before any provider call
    /// - `SyncError::Provider` if the single-target synchronization fails
    /// - `SyncError::ForkListing` / `SyncError::Cancelled` from fan-out
    pub async fn run(
        &self,
        link: &Link,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "dispatch",
            %run_id,
            link = link.name.as_deref().unwrap_or("unnamed")
        );
        self.run_inner(link, cancel).instrument(span).await
    }

    async fn run_inner(
        &self,
        link: &Link,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        if !link.enabled {
            tracing::info!("link disabled, skipping");
            return Ok(SyncReport::not_enabled());
        }

        let (from, to) = match (&link.from, &link.to) {
            (Some(from), Some(to)) => (from, to),
            (from, to) => {
                let missing: Vec<&str> = [("from", from.is_none()), ("to", to.is_none())]
                    .into_iter()
                    .filter_map(|(name, absent)| absent.then_some(name))
                    .collect();
                tracing::info!(?missing, "link incomplete, skipping");
                return Ok(SyncReport::missing_endpoints(&missing));
            }
        };

        let plan = self.plan(from, to)?;

        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled { processed: 0 });
        }

        let synchronizer = Synchronizer::new(
            plan.source.clone(),
            plan.target,
            self.bot.clone(),
            self.options.opt_out_label.clone(),
        );

        match plan.route {
            Route::Single(to) => {
                tracing::info!(from = %plan.from, to = %to, "synchronizing repository");
                let outcome = synchronizer.sync(&plan.from, &to).await?;
                Ok(SyncReport::single(outcome))
            }
            Route::FanOut(template) => {
                tracing::info!(from = %plan.from, "synchronizing all forks");
                let enumerator = ForkEnumerator::new(
                    Arc::clone(plan.source.user()),
                    Arc::new(synchronizer),
                    self.options.page_size,
                    self.options.concurrency,
                );
                let result = enumerator.enumerate(&plan.from, &template, cancel).await?;
                Ok(SyncReport::fan_out(result.fork_count, result.outcomes))
            }
        }
    }

    /// Validate a complete link without calling any provider.
    fn plan(&self, from: &RepoRef, to: &RepoRef) -> Result<Plan, SyncError> {
        let route_kind =
            to.target_kind()
                .ok_or_else(|| SyncError::UnsupportedTargetType(to.kind.clone()))?;
        if from.target_kind() != Some(TargetKind::Repo) {
            return Err(SyncError::UnsupportedTargetType(from.kind.clone()));
        }

        let from_endpoint = Endpoint::from_ref(from)?;
        let route = match route_kind {
            TargetKind::Repo => Route::Single(Endpoint::from_ref(to)?),
            TargetKind::ForkAll => Route::FanOut(to.clone()),
        };

        let source = self.forges.resolve(&from.provider)?.clone();
        let target = self.forges.resolve(&to.provider)?.clone();
        source.bot()?;
        target.bot()?;

        Ok(Plan {
            from: from_endpoint,
            source,
            target,
            route,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::RepoId;
    use crate::forge::mock::MockForge;
    use crate::forge::ForgeProvider;

    fn dispatcher(mock: &MockForge) -> Dispatcher {
        let forges = Forges::new().with(
            ForgeProvider::GitHub,
            ForgeClients::shared(Arc::new(mock.clone())),
        );
        Dispatcher::new(
            forges,
            BotIdentity::new("backstroke-bot"),
            SyncOptions::default(),
        )
    }

    fn upstream() -> RepoRef {
        RepoRef::repo("github", &RepoId::parse("up/stream").unwrap(), "master")
    }

    #[test]
    fn options_from_config_defaults() {
        let options = SyncOptions::from_config(&Config::default());
        assert_eq!(options, SyncOptions::default());
        assert_eq!(options.page_size, 100);
        assert_eq!(options.concurrency, 8);
        assert_eq!(options.opt_out_label, "optout");
    }

    #[tokio::test]
    async fn fork_all_upstream_rejected() {
        let mock = MockForge::new();
        let link = Link {
            enabled: true,
            from: Some(RepoRef::fork_all("github")),
            to: Some(RepoRef::fork_all("github")),
            ..Default::default()
        };
        let err = dispatcher(&mock)
            .run(&link, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, SyncError::UnsupportedTargetType("fork-all".into()));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn cancelled_before_start() {
        let mock = MockForge::new();
        let link = Link {
            enabled: true,
            from: Some(upstream()),
            to: Some(RepoRef::fork_all("github")),
            ..Default::default()
        };
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = dispatcher(&mock).run(&link, &cancel).await.unwrap_err();
        assert_eq!(err, SyncError::Cancelled { processed: 0 });
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn missing_bot_is_configuration_error() {
        let mock = MockForge::new();
        let forges = Forges::new().with(
            ForgeProvider::GitHub,
            ForgeClients::user_only(Arc::new(mock.clone())),
        );
        let dispatcher = Dispatcher::new(
            forges,
            BotIdentity::new("backstroke-bot"),
            SyncOptions::default(),
        );
        let link = Link {
            enabled: true,
            from: Some(upstream()),
            to: Some(RepoRef::fork_all("github")),
            ..Default::default()
        };
        let err = dispatcher
            .run(&link, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(mock.call_count(), 0);
    }
}
