//! Per-account aggregation and per-reel virality scoring.
//!
//! Two passes over one source set. Pass 1 rolls reels up into account
//! aggregates (total views, recency buckets, average). Pass 2 writes a
//! virality score onto every reel through a runtime-resolved field name,
//! because the score column has been renamed in the live base before.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use reelsync_airtable::{AirtableClient, Record, RecordPatch, MAX_PATCH_RECORDS};
use reelsync_core::types::{AccountFields, ReelFields, SourceSet};
use serde_json::{json, Map, Value};

use crate::error::PipelineError;

const CANONICAL_VIRALITY_FIELD: &str = "Virality score";
const NOTIFIED_FIELD: &str = "Virality notified";

/// Aggregates derived from one account's reels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AccountAggregates {
    pub total_views: i64,
    pub posts_1d: i64,
    pub posts_3d: i64,
    pub posts_7d: i64,
    pub avg_views: f64,
}

/// Computes the aggregates for one account's reels as of `today`.
///
/// Reels without a posting date count toward totals but toward no recency
/// bucket. The average is 0 when there are no reels.
#[must_use]
pub fn aggregate_account(reels: &[&ReelFields], today: NaiveDate) -> AccountAggregates {
    let mut agg = AccountAggregates::default();
    for reel in reels {
        agg.total_views += reel.views;
        if let Some(posted) = reel.date_of_posting {
            let days_old = (today - posted).num_days();
            if days_old == 0 {
                agg.posts_1d += 1;
            }
            if days_old < 3 {
                agg.posts_3d += 1;
            }
            if days_old < 7 {
                agg.posts_7d += 1;
            }
        }
    }
    if !reels.is_empty() {
        #[allow(clippy::cast_precision_loss)]
        {
            agg.avg_views = agg.total_views as f64 / reels.len() as f64;
        }
    }
    agg
}

/// Relative deviation of one reel's views from its account average.
///
/// Zero when the average is zero: a brand-new account has no baseline to
/// deviate from.
#[must_use]
pub fn virality(views: i64, avg_views: f64) -> f64 {
    if avg_views == 0.0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    {
        (views as f64 - avg_views) / avg_views
    }
}

/// Picks the live name of the virality score field from observed reel
/// field names.
///
/// First name containing `"Virality"` that is not the notified flag wins;
/// when none is present (every reel still unscored) the canonical name is
/// assumed.
#[must_use]
pub fn resolve_virality_field<'a, I>(field_names: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    field_names
        .into_iter()
        .find(|name| name.contains("Virality") && *name != NOTIFIED_FIELD)
        .unwrap_or(CANONICAL_VIRALITY_FIELD)
        .to_owned()
}

/// Counters reported by one aggregation stage run.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsStats {
    pub accounts_patched: usize,
    pub reels_scored: usize,
    pub malformed_reels: usize,
    pub failed_batches: usize,
}

/// Runs both aggregation passes over one source set.
///
/// Reels are listed untyped first so the resolver sees the store's real
/// field names; each record is then converted to [`ReelFields`], with
/// conversion failures logged and skipped. Every account in the accounts
/// table receives an aggregate patch, including accounts with no reels.
///
/// # Errors
///
/// Listing either table fails the stage. During the per-reel write pass an
/// [`reelsync_airtable::AirtableError::UnknownFieldName`] aborts the pass:
/// every remaining batch would hit the same mismatch. Other batch failures
/// are logged and skipped.
pub async fn run_metrics(
    store: &AirtableClient,
    source: SourceSet,
) -> Result<MetricsStats, PipelineError> {
    let raw_reels = store
        .list_all::<Map<String, Value>>(source.reels_table)
        .await?;

    let virality_field = resolve_virality_field(
        raw_reels
            .iter()
            .flat_map(|r| r.fields.keys())
            .map(String::as_str),
    );
    tracing::debug!(
        source = source.name,
        field = %virality_field,
        "resolved virality field name"
    );

    let mut stats = MetricsStats::default();
    let mut reels: Vec<Record<ReelFields>> = Vec::with_capacity(raw_reels.len());
    for record in raw_reels {
        match serde_json::from_value::<ReelFields>(Value::Object(record.fields)) {
            Ok(fields) => reels.push(Record {
                id: record.id,
                fields,
            }),
            Err(e) => {
                tracing::warn!(
                    source = source.name,
                    record = %record.id,
                    error = %e,
                    "skipping reel record with unreadable fields"
                );
                stats.malformed_reels += 1;
            }
        }
    }

    let accounts = store
        .list_all::<AccountFields>(source.accounts_table)
        .await?;

    let mut by_account: HashMap<&str, Vec<&ReelFields>> = HashMap::new();
    for record in &reels {
        if let Some(account_id) = record.fields.account_id() {
            by_account.entry(account_id).or_default().push(&record.fields);
        }
    }

    let today = Utc::now().date_naive();

    // Pass 1: aggregates for every listed account. An account with no
    // reels gets zeroes written, resetting stale numbers left behind when
    // its reels age out of the table.
    let empty: Vec<&ReelFields> = Vec::new();
    let mut averages: HashMap<String, f64> = HashMap::new();
    let mut account_patches = Vec::new();
    for account in &accounts {
        let account_reels = by_account.get(account.id.as_str()).unwrap_or(&empty);
        let agg = aggregate_account(account_reels, today);
        averages.insert(account.id.clone(), agg.avg_views);
        account_patches.push(RecordPatch::new(
            &account.id,
            json!({
                "Total Views": agg.total_views,
                "Posts (1D)": agg.posts_1d,
                "Posts (3D)": agg.posts_3d,
                "Posts (7D)": agg.posts_7d,
                "Avg view / video (L30D)": agg.avg_views,
            }),
        ));
    }

    for batch in account_patches.chunks(MAX_PATCH_RECORDS) {
        if let Err(e) = store.patch(source.accounts_table, batch).await {
            tracing::error!(
                source = source.name,
                batch = batch.len(),
                error = %e,
                "account aggregate batch failed"
            );
            stats.failed_batches += 1;
        } else {
            stats.accounts_patched += batch.len();
        }
    }

    // Pass 2: per-reel virality through the resolved field name.
    let mut reel_patches = Vec::new();
    for record in &reels {
        let Some(account_id) = record.fields.account_id() else {
            continue;
        };
        let Some(avg) = averages.get(account_id) else {
            continue;
        };
        let score = virality(record.fields.views, *avg);
        reel_patches.push(RecordPatch::new(
            &record.id,
            json!({ (virality_field.as_str()): score }),
        ));
    }

    for batch in reel_patches.chunks(MAX_PATCH_RECORDS) {
        match store.patch(source.reels_table, batch).await {
            Ok(()) => stats.reels_scored += batch.len(),
            Err(e @ reelsync_airtable::AirtableError::UnknownFieldName { .. }) => {
                tracing::error!(
                    source = source.name,
                    field = %virality_field,
                    error = %e,
                    "virality field rejected by the store; aborting scoring pass"
                );
                return Err(e.into());
            }
            Err(e) => {
                tracing::error!(
                    source = source.name,
                    batch = batch.len(),
                    error = %e,
                    "virality batch failed"
                );
                stats.failed_batches += 1;
            }
        }
    }

    tracing::info!(
        source = source.name,
        accounts = stats.accounts_patched,
        reels = stats.reels_scored,
        malformed = stats.malformed_reels,
        failed_batches = stats.failed_batches,
        "aggregation finished"
    );
    Ok(stats)
}
