//! engine::opt_out
//!
//! Opt-out checking.
//!
//! A repository opts out of automated pull requests by having a pull
//! request (open or merged) that carries the opt-out label. The check is a
//! single issue search; any match means opted out.

use crate::core::types::RepoId;
use crate::forge::{Forge, ForgeError, Forges};

use super::SyncError;

/// Search query matching labelled pull requests in `repo`.
///
/// Labels containing whitespace are quoted so the search reads them as one
/// qualifier value.
pub fn opt_out_query(repo: &RepoId, label: &str) -> String {
    if label.contains(char::is_whitespace) {
        format!("repo:{} is:pr label:\"{}\"", repo, label)
    } else {
        format!("repo:{} is:pr label:{}", repo, label)
    }
}

/// Whether `repo` on `provider` has opted out.
///
/// # Errors
///
/// - `SyncError::UnsupportedProvider` / `ProviderNotConfigured` if the
///   provider cannot be resolved. No call is made in that case.
/// - `SyncError::Provider` if the search fails.
pub async fn has_opted_out(
    forges: &Forges,
    provider: &str,
    repo: &RepoId,
    label: &str,
) -> Result<bool, SyncError> {
    let clients = forges.resolve(provider)?;
    Ok(check(clients.user().as_ref(), repo, label).await?)
}

/// Run the opt-out search against an already resolved client.
pub(crate) async fn check(forge: &dyn Forge, repo: &RepoId, label: &str) -> Result<bool, ForgeError> {
    let matches = forge.search_issues(&opt_out_query(repo, label)).await?;
    tracing::debug!(%repo, matches, "opt-out search");
    Ok(matches > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::mock::{FailOn, MockForge};
    use crate::forge::{ForgeClients, ForgeProvider};
    use std::sync::Arc;

    fn repo() -> RepoId {
        RepoId::parse("alice/stream").unwrap()
    }

    fn forges(mock: &MockForge) -> Forges {
        Forges::new().with(
            ForgeProvider::GitHub,
            ForgeClients::shared(Arc::new(mock.clone())),
        )
    }

    #[test]
    fn query_format() {
        assert_eq!(
            opt_out_query(&repo(), "optout"),
            "repo:alice/stream is:pr label:optout"
        );
    }

    #[test]
    fn label_with_whitespace_is_quoted() {
        assert_eq!(
            opt_out_query(&repo(), "no sync"),
            "repo:alice/stream is:pr label:\"no sync\""
        );
    }

    #[tokio::test]
    async fn multi_word_label_matches_whole() {
        let mock = MockForge::new().with_opt_out(&repo(), "no sync");
        assert!(has_opted_out(&forges(&mock), "github", &repo(), "no sync")
            .await
            .unwrap());

        let other = MockForge::new().with_opt_out(&repo(), "no");
        assert!(!has_opted_out(&forges(&other), "github", &repo(), "no sync")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn labelled_pr_means_opted_out() {
        let mock = MockForge::new().with_opt_out(&repo(), "optout");
        assert!(has_opted_out(&forges(&mock), "github", &repo(), "optout")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn label_must_match() {
        let mock = MockForge::new().with_opt_out(&repo(), "optout");
        assert!(!has_opted_out(&forges(&mock), "github", &repo(), "no-sync")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn unsupported_provider_makes_no_call() {
        let mock = MockForge::new();
        let err = has_opted_out(&forges(&mock), "bitbucket", &repo(), "optout")
            .await
            .unwrap_err();
        assert_eq!(err, SyncError::UnsupportedProvider("bitbucket".into()));
        assert!(err.is_configuration());
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn search_failure_is_provider_error() {
        let mock = MockForge::new().fail_on(FailOn::SearchIssues(ForgeError::RateLimited));
        let err = has_opted_out(&forges(&mock), "github", &repo(), "optout")
            .await
            .unwrap_err();
        assert_eq!(err, SyncError::Provider(ForgeError::RateLimited));
    }
}
