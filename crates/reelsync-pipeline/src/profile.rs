//! Profile refresh: mirror provider profile snapshots into account records.
//!
//! Runs before ingestion so follower snapshots on new reels reflect the
//! freshest count. Every failure here is per-account: one unreachable or
//! renamed profile never blocks the rest of the table.

use futures::stream::{self, StreamExt};
use reelsync_airtable::{AirtableClient, RecordPatch};
use reelsync_core::types::{AccountFields, SourceSet, SwarmFields, SWARM_TABLE};
use reelsync_instagram::{InstagramClient, UserInfo};
use serde_json::{json, Value};

use crate::error::PipelineError;

/// Counters reported by one profile refresh run.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProfileStats {
    pub refreshed: usize,
    pub failed: usize,
    pub skipped_no_username: usize,
}

/// Field map for one account's profile patch.
///
/// The follower delta compares the fresh count against the stored snapshot,
/// so its accuracy depends on the stage having last run about a day ago.
#[must_use]
pub fn profile_patch_fields(info: &UserInfo, stored_followers: i64) -> Value {
    let mut fields = json!({
        "Name": info.full_name,
        "Bio": info.biography,
        "Bio link": info.external_url.clone().unwrap_or_default(),
        "Followers": info.follower_count,
        "Followers (+ L24H)": info.follower_count - stored_followers,
        "Following": info.following_count,
        "Posts": info.media_count,
    });
    if let Some(url) = info.profile_pic_url() {
        fields["Profile picture"] = json!([{ "url": url }]);
    }
    fields
}

/// Refreshes every account profile in one source set's accounts table.
///
/// Provider lookups run up to `max_concurrent` at a time; store patches go
/// out one record each as results complete.
///
/// # Errors
///
/// Only the initial accounts listing fails the stage.
pub async fn refresh_account_profiles(
    store: &AirtableClient,
    provider: &InstagramClient,
    source: SourceSet,
    max_concurrent: usize,
) -> Result<ProfileStats, PipelineError> {
    let accounts = store
        .list_all::<AccountFields>(source.accounts_table)
        .await?;

    let mut stats = ProfileStats::default();
    let mut named = Vec::with_capacity(accounts.len());
    for record in accounts {
        match record.fields.username.clone() {
            Some(username) => named.push((record.id, username, record.fields.followers)),
            None => stats.skipped_no_username += 1,
        }
    }

    let lookups = named.into_iter().map(|(id, username, followers)| async move {
        let result = provider.user_info(&username).await;
        (id, username, followers, result)
    });
    let mut results = stream::iter(lookups).buffer_unordered(max_concurrent.max(1));

    while let Some((id, username, followers, result)) = results.next().await {
        let info = match result {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!(
                    source = source.name,
                    account = %username,
                    error = %e,
                    "profile lookup failed; skipping account"
                );
                stats.failed += 1;
                continue;
            }
        };

        let patch = RecordPatch::new(&id, profile_patch_fields(&info, followers));
        match store.patch(source.accounts_table, &[patch]).await {
            Ok(()) => {
                tracing::info!(source = source.name, account = %username, "profile refreshed");
                stats.refreshed += 1;
            }
            Err(e) => {
                tracing::warn!(
                    source = source.name,
                    account = %username,
                    error = %e,
                    "profile patch failed; skipping account"
                );
                stats.failed += 1;
            }
        }
    }

    tracing::info!(
        source = source.name,
        refreshed = stats.refreshed,
        failed = stats.failed,
        "profile refresh finished"
    );
    Ok(stats)
}

/// Refreshes `Post count` on every swarm account from the provider's
/// `media_count`.
///
/// # Errors
///
/// Only the swarm table listing fails the stage.
pub async fn refresh_swarm_post_counts(
    store: &AirtableClient,
    provider: &InstagramClient,
) -> Result<ProfileStats, PipelineError> {
    let rows = store.list_all::<SwarmFields>(SWARM_TABLE).await?;

    let mut stats = ProfileStats::default();
    for record in rows {
        let Some(username) = record.fields.username else {
            stats.skipped_no_username += 1;
            continue;
        };

        let info = match provider.user_info(&username).await {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!(account = %username, error = %e, "swarm lookup failed; skipping");
                stats.failed += 1;
                continue;
            }
        };

        let patch = RecordPatch::new(&record.id, json!({ "Post count": info.media_count }));
        match store.patch(SWARM_TABLE, &[patch]).await {
            Ok(()) => {
                tracing::info!(account = %username, post_count = info.media_count, "post count updated");
                stats.refreshed += 1;
            }
            Err(e) => {
                tracing::warn!(account = %username, error = %e, "post count patch failed; skipping");
                stats.failed += 1;
            }
        }
    }

    tracing::info!(
        refreshed = stats.refreshed,
        failed = stats.failed,
        "swarm post count refresh finished"
    );
    Ok(stats)
}
