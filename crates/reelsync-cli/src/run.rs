//! The `run` command: wire up the clients and execute pipeline stages.
//!
//! Stage order matters: profiles refresh before ingestion so follower
//! snapshots are current, and metrics aggregate before notification so
//! virality scores exist to compare against the threshold. A stage failure
//! is logged and the sequence continues; only configuration and the
//! settings fetch abort the run outright.

use reelsync_airtable::AirtableClient;
use reelsync_core::types::{AGENCY, COMPETITOR};
use reelsync_core::{AppConfig, RunSettings};
use reelsync_instagram::InstagramClient;
use reelsync_pipeline::{ingest, metrics, notify, profile, readiness, PipelineError};
use reelsync_telegram::TelegramClient;

use crate::Stage;

const ALL_STAGES: [Stage; 9] = [
    Stage::ProfileAgency,
    Stage::IngestAgency,
    Stage::Metrics,
    Stage::ProfileCompetitors,
    Stage::IngestCompetitors,
    Stage::SwarmPosts,
    Stage::SwarmReadiness,
    Stage::GrowthMode,
    Stage::Notify,
];

struct Clients {
    store: AirtableClient,
    provider: InstagramClient,
    telegram: TelegramClient,
}

pub(crate) async fn execute(config: &AppConfig, only: Option<Stage>) -> anyhow::Result<()> {
    let store = AirtableClient::with_base_url(
        &config.airtable_api_key,
        &config.airtable_base_id,
        config.request_timeout_secs,
        &config.airtable_base_url,
    )
    .map_err(|e| anyhow::anyhow!("failed to build store client: {e}"))?;

    // Nothing can run without the settings table: provider and messaging
    // credentials live there.
    let settings = reelsync_pipeline::fetch_run_settings(&store)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load run settings: {e}"))?;
    tracing::debug!(?settings, "run settings loaded");

    let provider = InstagramClient::with_base_url(
        &settings.rapidapi_key,
        config.request_timeout_secs,
        config.max_retries,
        config.retry_backoff_base_ms,
        &config.rapidapi_base_url,
    )
    .map_err(|e| anyhow::anyhow!("failed to build provider client: {e}"))?;

    let telegram = TelegramClient::with_base_url(
        &settings.telegram_bot_token,
        config.request_timeout_secs,
        &config.telegram_base_url,
    )
    .map_err(|e| anyhow::anyhow!("failed to build messaging client: {e}"))?;

    let clients = Clients {
        store,
        provider,
        telegram,
    };

    let stages: &[Stage] = match only {
        Some(ref stage) => std::slice::from_ref(stage),
        None => &ALL_STAGES,
    };

    let mut failed = 0usize;
    for stage in stages {
        tracing::info!(stage = ?stage, "stage starting");
        if let Err(e) = run_stage(*stage, config, &settings, &clients).await {
            tracing::error!(stage = ?stage, error = %e, "stage failed; continuing");
            failed += 1;
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} stage(s) failed", stages.len());
    }
    Ok(())
}

async fn run_stage(
    stage: Stage,
    config: &AppConfig,
    settings: &RunSettings,
    clients: &Clients,
) -> Result<(), PipelineError> {
    match stage {
        Stage::ProfileAgency => {
            profile::refresh_account_profiles(
                &clients.store,
                &clients.provider,
                AGENCY,
                config.max_concurrent_accounts,
            )
            .await?;
        }
        Stage::IngestAgency => {
            ingest::run_ingest(
                &clients.store,
                &clients.provider,
                AGENCY,
                config.retention_days,
            )
            .await?;
        }
        Stage::Metrics => {
            metrics::run_metrics(&clients.store, AGENCY).await?;
        }
        Stage::ProfileCompetitors => {
            profile::refresh_account_profiles(
                &clients.store,
                &clients.provider,
                COMPETITOR,
                config.max_concurrent_accounts,
            )
            .await?;
        }
        Stage::IngestCompetitors => {
            ingest::run_ingest(
                &clients.store,
                &clients.provider,
                COMPETITOR,
                config.retention_days,
            )
            .await?;
        }
        Stage::SwarmPosts => {
            profile::refresh_swarm_post_counts(&clients.store, &clients.provider).await?;
        }
        Stage::SwarmReadiness => {
            readiness::mark_swarm_ready(&clients.store, settings.swarm_ready).await?;
        }
        Stage::GrowthMode => {
            readiness::mark_growth_mode(&clients.store, AGENCY, settings.growth_ready).await?;
        }
        Stage::Notify => {
            notify::run_notify(
                &clients.store,
                &clients.telegram,
                AGENCY,
                &settings.telegram_chat_id,
                settings.virality_threshold_pct,
            )
            .await?;
        }
    }
    Ok(())
}
