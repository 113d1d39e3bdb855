//! Incremental reel ingestion: paginate the provider, drop items outside
//! the retention window, suppress already-stored external ids, pick the
//! best video rendition, and append new records to the store.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use reelsync_airtable::AirtableClient;
use reelsync_core::types::{AccountFields, NewReel, ReelFields, SourceSet};
use reelsync_instagram::{parse_reel_item, InstagramClient, VideoVersion};

use crate::error::PipelineError;

/// Set of external content ids already present in the store.
///
/// Seeded once per run from a full listing of the target reel table, so
/// dedup accuracy is bounded by what the store held at seed time. Two
/// pipeline instances racing against the same base can double-insert;
/// writes are append-only so the duplicates are a data-quality concern,
/// not a correctness one — aggregation simply double-counts them.
pub struct DedupIndex {
    ids: HashSet<String>,
}

impl DedupIndex {
    #[must_use]
    pub fn new(ids: impl IntoIterator<Item = String>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    /// Seeds the index from the current store state of `reels_table`.
    ///
    /// # Errors
    ///
    /// Propagates store listing errors; without a seed the whole ingestion
    /// stage would re-insert everything, so this is fatal to the stage.
    pub async fn seed(store: &AirtableClient, reels_table: &str) -> Result<Self, PipelineError> {
        let records = store.list_all::<ReelFields>(reels_table).await?;
        let index = Self::new(records.into_iter().filter_map(|r| r.fields.reel_id));
        tracing::info!(
            table = reels_table,
            known_ids = index.len(),
            "seeded dedup index"
        );
        Ok(index)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn insert(&mut self, id: String) -> bool {
        self.ids.insert(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// True when `posted_at` is within the retention horizon relative to `now`.
///
/// `now` is captured once at the start of an account's scrape so a single
/// run stays internally consistent.
#[must_use]
pub fn within_window(posted_at: DateTime<Utc>, now: DateTime<Utc>, horizon_days: i64) -> bool {
    posted_at >= now - Duration::days(horizon_days)
}

/// Picks the rendition with the greatest height.
///
/// An empty candidate list yields `None`; the writer stores an empty URL
/// rather than failing the record.
#[must_use]
pub fn best_variant(versions: &[VideoVersion]) -> Option<&VideoVersion> {
    versions.iter().max_by_key(|v| v.height)
}

/// Why a single source item was not ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingId,
    Duplicate,
    TooOld,
    Malformed,
}

/// Explicit per-item result consumed by the account loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Inserted,
    Skipped(SkipReason),
}

/// Counters reported by one ingestion stage run.
#[derive(Debug, Default, Clone, Copy)]
pub struct IngestStats {
    pub accounts: usize,
    pub failed_accounts: usize,
    pub inserted: usize,
    pub skipped_duplicate: usize,
    pub skipped_old: usize,
    pub skipped_malformed: usize,
    pub skipped_missing_id: usize,
}

impl IngestStats {
    fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Inserted => self.inserted += 1,
            ItemOutcome::Skipped(SkipReason::Duplicate) => self.skipped_duplicate += 1,
            ItemOutcome::Skipped(SkipReason::TooOld) => self.skipped_old += 1,
            ItemOutcome::Skipped(SkipReason::Malformed) => self.skipped_malformed += 1,
            ItemOutcome::Skipped(SkipReason::MissingId) => self.skipped_missing_id += 1,
        }
    }
}

/// Runs ingestion for one source set (accounts table + reels table).
///
/// A transport failure mid-scrape aborts only that account's remaining
/// pagination; the loop moves on to the next account.
///
/// # Errors
///
/// Only seeding the dedup index or listing the accounts table can fail the
/// stage as a whole.
pub async fn run_ingest(
    store: &AirtableClient,
    provider: &InstagramClient,
    source: SourceSet,
    retention_days: i64,
) -> Result<IngestStats, PipelineError> {
    let mut dedup = DedupIndex::seed(store, source.reels_table).await?;
    let accounts = store
        .list_all::<AccountFields>(source.accounts_table)
        .await?;

    let mut stats = IngestStats {
        accounts: accounts.len(),
        ..IngestStats::default()
    };

    for account in accounts {
        let Some(username) = account.fields.username.clone() else {
            tracing::warn!(
                source = source.name,
                record = %account.id,
                "skipping account with missing username"
            );
            continue;
        };

        // Wall clock for the whole of this account's scrape.
        let now = Utc::now();

        if let Err(e) = ingest_account(
            store,
            provider,
            source,
            &account.id,
            &username,
            account.fields.followers,
            now,
            retention_days,
            &mut dedup,
            &mut stats,
        )
        .await
        {
            tracing::error!(
                source = source.name,
                account = %username,
                error = %e,
                "aborting account ingestion"
            );
            stats.failed_accounts += 1;
        }
    }

    tracing::info!(
        source = source.name,
        inserted = stats.inserted,
        duplicates = stats.skipped_duplicate,
        too_old = stats.skipped_old,
        malformed = stats.skipped_malformed,
        failed_accounts = stats.failed_accounts,
        "ingestion finished"
    );
    Ok(stats)
}

/// Paginates one account's reels and writes the new ones.
#[allow(clippy::too_many_arguments)]
async fn ingest_account(
    store: &AirtableClient,
    provider: &InstagramClient,
    source: SourceSet,
    account_record_id: &str,
    username: &str,
    followers_snapshot: i64,
    now: DateTime<Utc>,
    retention_days: i64,
    dedup: &mut DedupIndex,
    stats: &mut IngestStats,
) -> Result<(), PipelineError> {
    let mut max_id: Option<String> = None;

    loop {
        let page = provider.user_reels_page(username, max_id.as_deref()).await?;
        tracing::debug!(
            account = username,
            items = page.items.len(),
            cursor = max_id.as_deref().unwrap_or("<first>"),
            "fetched reels page"
        );

        for item in &page.items {
            let outcome = ingest_item(
                store,
                source,
                account_record_id,
                username,
                followers_snapshot,
                now,
                retention_days,
                dedup,
                item,
            )
            .await?;
            stats.record(outcome);
        }

        match page.next_max_id {
            Some(next) => max_id = Some(next),
            None => return Ok(()),
        }
    }
}

/// Evaluates and, when eligible, stores a single source item.
///
/// Malformed items are a skip, never an error: one broken payload must not
/// abort the account's loop. The dedup index is updated only after the
/// store confirms the create, so a failed write stays retryable next run.
#[allow(clippy::too_many_arguments)]
async fn ingest_item(
    store: &AirtableClient,
    source: SourceSet,
    account_record_id: &str,
    username: &str,
    followers_snapshot: i64,
    now: DateTime<Utc>,
    retention_days: i64,
    dedup: &mut DedupIndex,
    item: &serde_json::Value,
) -> Result<ItemOutcome, PipelineError> {
    let media = match parse_reel_item(item) {
        Ok(media) => media,
        Err(e) => {
            tracing::warn!(
                account = username,
                error = %e,
                item = %item,
                "skipping malformed reel item"
            );
            return Ok(ItemOutcome::Skipped(SkipReason::Malformed));
        }
    };

    let Some(code) = media.code.clone() else {
        tracing::debug!(account = username, "skipping item with no external id");
        return Ok(ItemOutcome::Skipped(SkipReason::MissingId));
    };

    if dedup.contains(&code) {
        tracing::debug!(account = username, reel = %code, "skipping duplicate reel");
        return Ok(ItemOutcome::Skipped(SkipReason::Duplicate));
    }

    let Some(posted_at) = DateTime::from_timestamp(media.taken_at, 0) else {
        tracing::warn!(
            account = username,
            reel = %code,
            taken_at = media.taken_at,
            "skipping reel with out-of-range timestamp"
        );
        return Ok(ItemOutcome::Skipped(SkipReason::Malformed));
    };

    if !within_window(posted_at, now, retention_days) {
        tracing::debug!(account = username, reel = %code, posted = %posted_at, "skipping old reel");
        return Ok(ItemOutcome::Skipped(SkipReason::TooOld));
    }

    let download_link = best_variant(&media.video_versions)
        .map(|v| v.url.clone())
        .unwrap_or_default();

    let record = NewReel {
        account: vec![account_record_id.to_owned()],
        followers_snapshot,
        caption: media.caption_text().to_owned(),
        comment_count: media.comment_count,
        views: media.play_count,
        like_count: media.like_count,
        date_of_posting: posted_at.date_naive(),
        reel_id: code.clone(),
        download_link,
    };

    store.create(source.reels_table, &record).await?;
    dedup.insert(code.clone());
    tracing::info!(account = username, reel = %code, "inserted reel");
    Ok(ItemOutcome::Inserted)
}
