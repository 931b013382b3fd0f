//! engine::forks
//!
//! Fan-out over every fork of an upstream repository.
//!
//! # Paging
//!
//! Pages are fetched one at a time, starting from page 0. A page shorter
//! than the page size is the last one. The fork count is
//! `page * page_size + items_on_last_page`, which holds when the last page
//! is page 0 as well.
//!
//! # Concurrency
//!
//! All forks of a page are synchronized concurrently, at most
//! `concurrency` at a time. The next page is fetched only once every fork
//! of the current page has settled. A failing fork yields a
//! `ProviderError` outcome and does not affect its siblings.
//!
//! # Cancellation
//!
//! The token is checked before each page fetch and before each fork
//! acquires a concurrency permit. Synchronizations already running are
//! allowed to finish.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::core::types::{RepoId, RepoRef};
use crate::forge::{Forge, ForkSummary};

use super::pull_request::{Endpoint, Synchronizer};
use super::{ForkOutcome, SyncError, SyncOutcome};

/// Paging state of one fan-out run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForkCursor {
    /// Zero-based page to fetch next.
    pub page: u32,
    pub page_size: u32,
    /// Forks on fully processed pages.
    pub processed: u64,
}

impl ForkCursor {
    pub fn new(page_size: u32) -> Self {
        Self {
            page: 0,
            page_size,
            processed: 0,
        }
    }

    /// Whether a page with `items` entries is the last one.
    pub fn is_last_page(&self, items: usize) -> bool {
        items < self.page_size as usize
    }

    /// Total forks once the page with `items` entries turned out to be last.
    pub fn fork_count(&self, items: usize) -> u64 {
        u64::from(self.page) * u64::from(self.page_size) + items as u64
    }

    /// Move past a fully processed page of `items` entries.
    pub fn advance(&mut self, items: usize) {
        self.processed += items as u64;
        self.page += 1;
    }
}

/// Result of a completed fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enumeration {
    pub fork_count: u64,
    /// Pages fetched, including the terminal one.
    pub pages: u32,
    pub outcomes: Vec<ForkOutcome>,
}

/// Reference to one fork as a synchronization target.
///
/// Provider comes from the template, the branch from upstream.
pub fn fork_target(template: &RepoRef, fork: &ForkSummary, upstream: &Endpoint) -> RepoRef {
    RepoRef {
        private: fork.private,
        fork: true,
        branches: Vec::new(),
        ..RepoRef::repo(
            template.provider.clone(),
            &fork.id,
            upstream.branch.as_str(),
        )
    }
}

/// Drives the synchronizer over every fork of an upstream.
pub struct ForkEnumerator {
    /// Client that lists upstream's forks.
    lister: Arc<dyn Forge>,
    synchronizer: Arc<Synchronizer>,
    page_size: u32,
    concurrency: usize,
}

impl ForkEnumerator {
    pub fn new(
        lister: Arc<dyn Forge>,
        synchronizer: Arc<Synchronizer>,
        page_size: u32,
        concurrency: usize,
    ) -> Self {
        Self {
            lister,
            synchronizer,
            page_size: page_size.max(1),
            concurrency: concurrency.max(1),
        }
    }

    /// Synchronize every fork of `from`.
    ///
    /// # Errors
    ///
    /// - `SyncError::ForkListing` if a page cannot be listed; forks on
    ///   earlier pages have already been synchronized
    /// - `SyncError::Cancelled` if `cancel` fires
    /// - `SyncError::InvalidRepository` if a synthesized target is invalid
    pub async fn enumerate(
        &self,
        from: &Endpoint,
        template: &RepoRef,
        cancel: &CancellationToken,
    ) -> Result<Enumeration, SyncError> {
        let mut cursor = ForkCursor::new(self.page_size);
        let mut outcomes = Vec::new();

        loop {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled {
                    processed: cursor.processed,
                });
            }

            let forks = self
                .lister
                .list_forks(&from.repo, cursor.page, cursor.page_size)
                .await
                .map_err(|source| SyncError::ForkListing {
                    page: cursor.page,
                    processed: cursor.processed,
                    source,
                })?;
            let items = forks.len();
            tracing::debug!(page = cursor.page, items, "fork page listed");

            let targets = forks
                .iter()
                .map(|fork| Endpoint::from_ref(&fork_target(template, fork, from)))
                .collect::<Result<Vec<_>, _>>()?;

            let (page_outcomes, cancelled) = self.run_page(from, targets, cancel).await;
            if cancelled {
                return Err(SyncError::Cancelled {
                    processed: cursor.processed + page_outcomes.len() as u64,
                });
            }
            outcomes.extend(page_outcomes);

            if cursor.is_last_page(items) {
                let fork_count = cursor.fork_count(items);
                tracing::info!(fork_count, pages = cursor.page + 1, "fork enumeration complete");
                return Ok(Enumeration {
                    fork_count,
                    pages: cursor.page + 1,
                    outcomes,
                });
            }
            cursor.advance(items);
        }
    }

    /// Synchronize one page of targets concurrently.
    ///
    /// Returns the outcomes of the forks that ran, in listing order, and
    /// whether cancellation kept any fork from starting.
    async fn run_page(
        &self,
        from: &Endpoint,
        targets: Vec<Endpoint>,
        cancel: &CancellationToken,
    ) -> (Vec<ForkOutcome>, bool) {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks: JoinSet<(usize, Option<SyncOutcome>)> = JoinSet::new();
        let order: Vec<RepoId> = targets.iter().map(|t| t.repo.clone()).collect();

        for (index, target) in targets.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let synchronizer = Arc::clone(&self.synchronizer);
            let from = from.clone();
            let cancel = cancel.clone();

            tasks.spawn(async move {
                let _permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return (index, None),
                    permit = semaphore.acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => {
                            return (
                                index,
                                Some(SyncOutcome::ProviderError {
                                    detail: "concurrency limiter closed unexpectedly".into(),
                                }),
                            )
                        }
                    },
                };

                let outcome = match synchronizer.sync(&from, &target).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::warn!(fork = %target.repo, error = %e, "fork synchronization failed");
                        SyncOutcome::ProviderError {
                            detail: e.to_string(),
                        }
                    }
                };
                (index, Some(outcome))
            });
        }

        let mut settled: Vec<Option<SyncOutcome>> = vec![None; order.len()];
        let mut skipped = HashSet::new();
        while let Some(result) = tasks.join_next().await {
            match result {
                Ok((index, Some(outcome))) => settled[index] = Some(outcome),
                Ok((index, None)) => {
                    skipped.insert(index);
                }
                Err(join_error) => {
                    tracing::error!(error = %join_error, "fork synchronization task failed");
                }
            }
        }

        let outcomes = order
            .into_iter()
            .zip(settled)
            .enumerate()
            .filter(|(index, _)| !skipped.contains(index))
            .map(|(_, (fork, outcome))| ForkOutcome {
                fork,
                outcome: outcome.unwrap_or_else(|| SyncOutcome::ProviderError {
                    detail: "synchronization task failed".into(),
                }),
            })
            .collect();

        (outcomes, !skipped.is_empty())
    }
}
