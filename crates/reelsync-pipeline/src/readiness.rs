//! Readiness transitions driven by post-count and age thresholds.
//!
//! Swarm accounts flip to `READY` in one batched patch; agency accounts
//! enter `Growth mode` one record at a time so a single store rejection
//! cannot block the remaining promotions.

use reelsync_airtable::{AirtableClient, RecordPatch, MAX_PATCH_RECORDS};
use reelsync_core::settings::ReadyThresholds;
use reelsync_core::types::{AccountFields, SourceSet, SwarmFields, SWARM_TABLE};
use serde_json::json;

use crate::error::PipelineError;

const READY_STATUS: &str = "READY";
const GROWTH_STATUS: &str = "Growth mode";

/// Whether a swarm row qualifies for promotion. Rows already `READY` are
/// left alone.
#[must_use]
pub fn swarm_is_ready(fields: &SwarmFields, thresholds: ReadyThresholds) -> bool {
    if fields.status.as_deref() == Some(READY_STATUS) {
        return false;
    }
    fields.post_count >= thresholds.posts && fields.day >= thresholds.days
}

/// Whether an account qualifies for growth mode. Accounts already in
/// growth mode are left alone.
#[must_use]
pub fn growth_is_due(fields: &AccountFields, thresholds: ReadyThresholds) -> bool {
    if fields.account_status.as_deref() == Some(GROWTH_STATUS) {
        return false;
    }
    fields.posts >= thresholds.posts && fields.day >= thresholds.days
}

/// Counters reported by a readiness pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReadinessStats {
    pub promoted: usize,
    pub failed: usize,
}

/// Promotes qualifying swarm rows to `READY`.
///
/// # Errors
///
/// The swarm listing and any batch failure are fatal: the promotion is one
/// logical write split only by the store's batch limit.
pub async fn mark_swarm_ready(
    store: &AirtableClient,
    thresholds: ReadyThresholds,
) -> Result<ReadinessStats, PipelineError> {
    let rows = store.list_all::<SwarmFields>(SWARM_TABLE).await?;

    let patches: Vec<RecordPatch> = rows
        .iter()
        .filter(|r| swarm_is_ready(&r.fields, thresholds))
        .map(|r| RecordPatch::new(&r.id, json!({ "Status": READY_STATUS })))
        .collect();

    let mut stats = ReadinessStats::default();
    for batch in patches.chunks(MAX_PATCH_RECORDS) {
        store.patch(SWARM_TABLE, batch).await?;
        stats.promoted += batch.len();
    }

    tracing::info!(promoted = stats.promoted, "swarm readiness finished");
    Ok(stats)
}

/// Moves qualifying accounts into growth mode, one record at a time.
///
/// # Errors
///
/// Only the accounts listing fails the stage; per-record patch failures
/// are logged and skipped.
pub async fn mark_growth_mode(
    store: &AirtableClient,
    source: SourceSet,
    thresholds: ReadyThresholds,
) -> Result<ReadinessStats, PipelineError> {
    let accounts = store
        .list_all::<AccountFields>(source.accounts_table)
        .await?;

    let mut stats = ReadinessStats::default();
    for record in accounts {
        if !growth_is_due(&record.fields, thresholds) {
            continue;
        }

        let patch = RecordPatch::new(&record.id, json!({ "Account Status": GROWTH_STATUS }));
        match store.patch(source.accounts_table, &[patch]).await {
            Ok(()) => {
                tracing::info!(
                    source = source.name,
                    record = %record.id,
                    "account moved to growth mode"
                );
                stats.promoted += 1;
            }
            Err(e) => {
                tracing::warn!(
                    source = source.name,
                    record = %record.id,
                    error = %e,
                    "growth mode patch failed; skipping"
                );
                stats.failed += 1;
            }
        }
    }

    tracing::info!(
        source = source.name,
        promoted = stats.promoted,
        failed = stats.failed,
        "growth mode pass finished"
    );
    Ok(stats)
}
