//! Integration tests for link dispatch.
//!
//! Every test drives `Dispatcher::run` against `MockForge` and checks both
//! the report and the provider calls that were (or were not) made.

use std::sync::Arc;

use backstroke::core::types::{BotIdentity, Link, RepoId, RepoRef};
use backstroke::engine::{Dispatcher, ReportStatus, SkipReason, SyncError, SyncOptions, SyncOutcome};
use backstroke::forge::mock::{FailOn, MockForge, MockOperation};
use backstroke::forge::{ForgeClients, ForgeError, ForgeProvider, Forges};
use tokio_util::sync::CancellationToken;

fn upstream_id() -> RepoId {
    RepoId::parse("up/stream").unwrap()
}

fn downstream_id() -> RepoId {
    RepoId::parse("alice/stream").unwrap()
}

fn upstream() -> RepoRef {
    RepoRef::repo("github", &upstream_id(), "master")
}

fn downstream() -> RepoRef {
    RepoRef::repo("github", &downstream_id(), "main")
}

fn mock() -> MockForge {
    MockForge::new().with_branch(&upstream_id(), "master", "abc123")
}

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

fn link(from: Option<RepoRef>, to: Option<RepoRef>) -> Link {
    Link {
        name: Some("test link".into()),
        enabled: true,
        from,
        to,
    }
}

async fn run(mock: &MockForge, link: &Link) -> Result<backstroke::engine::SyncReport, SyncError> {
    dispatcher(mock).run(link, &CancellationToken::new()).await
}

// =============================================================================
// Fail-closed links
// =============================================================================

mod fail_closed {
    use super::*;

    #[tokio::test]
    async fn disabled_link_makes_no_calls() {
        let mock = mock();
        let mut link = link(Some(upstream()), Some(downstream()));
        link.enabled = false;

        let report = run(&mock, &link).await.unwrap();

        assert!(!report.is_enabled);
        assert_eq!(report.status, ReportStatus::Skipped);
        assert_eq!(report.error, Some(SkipReason::NotEnabled));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn disabled_link_without_endpoints_is_still_not_enabled() {
        let mock = mock();
        let link = Link::default();

        let report = run(&mock, &link).await.unwrap();
        assert_eq!(report.error, Some(SkipReason::NotEnabled));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn missing_to_is_described() {
        let mock = mock();
        let report = run(&mock, &link(Some(upstream()), None)).await.unwrap();

        assert!(report.is_enabled);
        assert_eq!(report.error, Some(SkipReason::MissingEndpoints));
        assert!(report.msg.as_deref().unwrap().contains("missing: to"));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn missing_both_is_described() {
        let mock = mock();
        let report = run(&mock, &link(None, None)).await.unwrap();

        assert!(report.msg.as_deref().unwrap().contains("missing: from, to"));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn report_json_matches_caller_shape() {
        let mock = mock();
        let report = run(&mock, &link(None, Some(downstream()))).await.unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["error"], "to-or-from-false");
        assert_eq!(json["isEnabled"], true);
        assert_eq!(json["many"], false);
        assert_eq!(json["forkCount"], 0);
    }
}

// =============================================================================
// Configuration errors
// =============================================================================

mod configuration {
    use super::*;

    #[tokio::test]
    async fn unsupported_target_type_fails_before_calls() {
        let mock = mock();
        let mut to = downstream();
        to.kind = "mirror".into();

        let err = run(&mock, &link(Some(upstream()), Some(to)))
            .await
            .unwrap_err();

        assert_eq!(err, SyncError::UnsupportedTargetType("mirror".into()));
        assert!(err.is_configuration());
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn unsupported_provider_fails_before_calls() {
        for provider in ["gitlab", "bitbucket", "sourcehut"] {
            let mock = mock();
            let mut to = downstream();
            to.provider = provider.into();

            let err = run(&mock, &link(Some(upstream()), Some(to)))
                .await
                .unwrap_err();

            assert_eq!(err, SyncError::UnsupportedProvider(provider.into()));
            assert!(err.is_configuration());
            assert_eq!(mock.call_count(), 0, "{provider}");
        }
    }

    #[tokio::test]
    async fn unsupported_upstream_provider_fails_before_calls() {
        let mock = mock();
        let mut from = upstream();
        from.provider = "gitlab".into();

        let err = run(&mock, &link(Some(from), Some(RepoRef::fork_all("github"))))
            .await
            .unwrap_err();
        assert_eq!(err, SyncError::UnsupportedProvider("gitlab".into()));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn provider_name_is_case_insensitive() {
        let mock = mock();
        let mut to = downstream();
        to.provider = "GitHub".into();

        let report = run(&mock, &link(Some(upstream()), Some(to))).await.unwrap();
        assert_eq!(report.status, ReportStatus::Ok);
    }

    #[tokio::test]
    async fn unconfigured_provider() {
        let mock = mock();
        let dispatcher = Dispatcher::new(
            Forges::new(),
            BotIdentity::new("backstroke-bot"),
            SyncOptions::default(),
        );

        let err = dispatcher
            .run(
                &link(Some(upstream()), Some(downstream())),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::ProviderNotConfigured { .. }));
        assert!(err.is_configuration());
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn missing_branch_is_invalid_repository() {
        let mock = mock();
        let mut to = downstream();
        to.branch = None;

        let err = run(&mock, &link(Some(upstream()), Some(to)))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidRepository(_)));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn canonical_name_form_accepted() {
        let mock = mock();
        let to: RepoRef = serde_json::from_value(serde_json::json!({
            "type": "repo",
            "provider": "github",
            "name": "alice/stream",
            "branch": "main",
            "branches": ["main"],
            "private": false
        }))
        .unwrap();

        let report = run(&mock, &link(Some(upstream()), Some(to))).await.unwrap();
        assert!(matches!(
            report.pull_request,
            Some(SyncOutcome::PullRequestCreated { .. })
        ));
    }
}

// =============================================================================
// Single target
// =============================================================================

mod single_target {
    use super::*;

    #[tokio::test]
    async fn opens_one_pull_request() {
        let mock = mock();
        let report = run(&mock, &link(Some(upstream()), Some(downstream())))
            .await
            .unwrap();

        assert_eq!(report.status, ReportStatus::Ok);
        assert!(!report.many);
        assert_eq!(report.fork_count, 1);
        assert_eq!(
            report.pull_request,
            Some(SyncOutcome::PullRequestCreated {
                number: 1,
                url: "https://github.com/alice/stream/pull/1".into()
            })
        );

        let creates: Vec<_> = mock
            .operations()
            .into_iter()
            .filter(|op| matches!(op, MockOperation::CreatePullRequest { .. }))
            .collect();
        assert_eq!(creates.len(), 1);
        match &creates[0] {
            MockOperation::CreatePullRequest {
                repo,
                head,
                base,
                title,
                body,
            } => {
                assert_eq!(repo, &downstream_id());
                assert_eq!(head, "backstroke-bot:master");
                assert_eq!(base, "main");
                assert_eq!(title, "Update from upstream repo up/stream");
                assert!(body.contains("`up/stream`"));
                assert!(body.contains("`backstroke-bot/stream`"));
            }
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn rerun_reports_already_exists_without_new_pr() {
        let mock = mock();
        let link = link(Some(upstream()), Some(downstream()));
        let dispatcher = dispatcher(&mock);
        let cancel = CancellationToken::new();

        dispatcher.run(&link, &cancel).await.unwrap();
        let second = dispatcher.run(&link, &cancel).await.unwrap();

        assert_eq!(second.pull_request, Some(SyncOutcome::AlreadyExists));
        assert_eq!(second.fork_count, 1);
        assert_eq!(mock.pull_requests().len(), 1);
        assert_eq!(mock.staging_repos().len(), 1);
    }

    #[tokio::test]
    async fn opted_out_target_skips_staging_and_pr() {
        let mock = mock().with_opt_out(&downstream_id(), "optout");
        let report = run(&mock, &link(Some(upstream()), Some(downstream())))
            .await
            .unwrap();

        assert_eq!(report.pull_request, Some(SyncOutcome::OptedOut));
        assert!(mock.operations().iter().all(|op| !op.is_write()));
        assert!(mock.staging_repos().is_empty());
    }

    #[tokio::test]
    async fn custom_opt_out_label() {
        let mock = mock().with_opt_out(&downstream_id(), "no-backstroke");
        let forges = Forges::new().with(
            ForgeProvider::GitHub,
            ForgeClients::shared(Arc::new(mock.clone())),
        );
        let dispatcher = Dispatcher::new(
            forges,
            BotIdentity::new("backstroke-bot"),
            SyncOptions {
                opt_out_label: "no-backstroke".into(),
                ..Default::default()
            },
        );

        let report = dispatcher
            .run(
                &link(Some(upstream()), Some(downstream())),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(report.pull_request, Some(SyncOutcome::OptedOut));
    }

    #[tokio::test]
    async fn provider_error_fails_the_run() {
        let mock = mock().fail_on(FailOn::CreatePullRequest(ForgeError::AuthFailed(
            "bot lacks access".into(),
        )));

        let err = run(&mock, &link(Some(upstream()), Some(downstream())))
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Provider(ForgeError::AuthFailed(_))));
        assert!(!err.is_configuration());
    }

    #[tokio::test]
    async fn separate_bot_client_does_writes() {
        let user = mock();
        let bot = MockForge::new();
        let forges = Forges::new().with(
            ForgeProvider::GitHub,
            ForgeClients::new(Arc::new(user.clone()), Arc::new(bot.clone())),
        );
        let dispatcher = Dispatcher::new(
            forges,
            BotIdentity::new("backstroke-bot"),
            SyncOptions::default(),
        );

        dispatcher
            .run(
                &link(Some(upstream()), Some(downstream())),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(user.operations().iter().all(|op| !op.is_write()));
        assert!(bot.operations().iter().all(|op| op.is_write()));
        assert_eq!(bot.pull_requests().len(), 1);
    }
}
