//! The synchronization, aggregation, and notification engine.
//!
//! Stages are strictly sequential: ingestion must finish before metrics
//! aggregation reads its output, and aggregation before notification.
//! Every stage tolerates per-account and per-record failures; the only
//! fatal conditions are a failed settings fetch (nothing can run without
//! credentials) and, within the per-reel write loop, a schema mismatch.

pub mod error;
pub mod ingest;
pub mod metrics;
pub mod notify;
pub mod profile;
pub mod readiness;

use reelsync_airtable::AirtableClient;
use reelsync_core::types::{self, SettingFields};
use reelsync_core::RunSettings;

pub use error::PipelineError;

/// Fetches and parses the automation settings table.
///
/// Runs once, before any stage; a failure here is fatal to the whole run.
///
/// # Errors
///
/// Propagates store errors and [`reelsync_core::ConfigError`] for missing
/// or malformed settings.
pub async fn fetch_run_settings(store: &AirtableClient) -> Result<RunSettings, PipelineError> {
    let records = store
        .list_all::<SettingFields>(types::SETTINGS_TABLE)
        .await?;
    let rows: Vec<(String, String)> = records
        .into_iter()
        .filter(|r| !r.fields.name.is_empty())
        .map(|r| (r.fields.name, r.fields.value))
        .collect();
    tracing::info!(settings = rows.len(), "loaded automation settings");
    Ok(RunSettings::from_rows(&rows)?)
}
