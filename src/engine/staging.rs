//! engine::staging
//!
//! Staging repository materialization.
//!
//! The pull request head must live in a repository the bot can push to.
//! The bot keeps its own copy of each upstream and, before every
//! synchronization, points the copy's branch at upstream's current head.
//! Creating the copy is idempotent on the provider side and the branch
//! move is forced, so materializing twice leaves the same state as once.

use crate::core::types::{BotIdentity, BranchName, RepoId};
use crate::forge::{ForgeClients, StagingRepo};

use super::SyncError;

/// Produce a bot-owned copy of `source` whose `branch` matches upstream.
///
/// Upstream is read with the link owner's client; the copy is created and
/// updated with the bot's client.
///
/// # Errors
///
/// - `SyncError::ProviderNotConfigured` if `clients` has no bot client
/// - `SyncError::Provider` if any gateway call fails
pub async fn materialize(
    clients: &ForgeClients,
    source: &RepoId,
    branch: &BranchName,
    bot: &BotIdentity,
) -> Result<StagingRepo, SyncError> {
    let bot_client = clients.bot()?;

    let sha = clients
        .user()
        .get_branch_head(source, branch.as_str())
        .await?;
    let staging = bot_client.create_staging_repo(source, bot).await?;
    let staging_id = staging.id()?;
    bot_client
        .update_branch(&staging_id, branch.as_str(), &sha)
        .await?;

    tracing::debug!(
        %source,
        staging = %staging_id,
        branch = %branch,
        %sha,
        "staging copy materialized"
    );
    Ok(staging)
}
