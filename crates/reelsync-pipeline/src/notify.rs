//! Viral reel notifications over Telegram.
//!
//! Delivery is at-most-once by policy: the notified flag is set after the
//! first delivery attempt whether or not the message went through, so a
//! flaky chat can cost a notification but never spam one reel repeatedly.

use std::collections::HashMap;

use reelsync_airtable::{AirtableClient, RecordPatch};
use reelsync_core::types::{AccountFields, ReelFields, SourceSet};
use reelsync_telegram::TelegramClient;
use serde_json::json;

use crate::error::PipelineError;

const NOTIFIED_FIELD: &str = "Virality notified";

/// Whether a reel is due a notification under `threshold_pct`.
///
/// The stored score is a ratio; the threshold is a percentage.
#[must_use]
pub fn should_notify(fields: &ReelFields, threshold_pct: f64) -> bool {
    !fields.virality_notified && fields.virality_score * 100.0 >= threshold_pct
}

/// Renders the notification text for one reel.
#[must_use]
pub fn notification_text(username: &str, fields: &ReelFields) -> String {
    let pct = fields.virality_score * 100.0;
    let code = fields.reel_id.as_deref().unwrap_or_default();
    format!(
        "@{username} just had a viral reel! (+{pct:.2}% over avg)\n\n\
         Views: {views}\n\
         Likes: {likes}\n\
         Comments: {comments}\n\n\
         https://www.instagram.com/reel/{code}\n\n\
         {caption}",
        views = fields.views,
        likes = fields.like_count,
        comments = fields.comment_count,
        caption = fields.caption,
    )
}

/// Counters reported by one notify stage run.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotifyStats {
    pub evaluated: usize,
    pub sent_video: usize,
    pub sent_text: usize,
    pub delivery_failures: usize,
    pub flag_failures: usize,
}

/// Evaluates every reel in `source` and notifies the resolved chat about
/// the viral ones.
///
/// The chat id is resolved exactly once, before the loop; per-reel failures
/// never re-trigger resolution. A download or video-upload failure degrades
/// that reel to a text message carrying an expired-link marker.
///
/// # Errors
///
/// Chat resolution failure and the initial table listings are fatal to the
/// stage: without a destination there is nothing to deliver to.
pub async fn run_notify(
    store: &AirtableClient,
    telegram: &TelegramClient,
    source: SourceSet,
    chat_id: &str,
    threshold_pct: f64,
) -> Result<NotifyStats, PipelineError> {
    let chat = telegram.resolve_chat(chat_id).await?;
    tracing::info!(chat = %chat, "notification chat resolved");

    let accounts = store
        .list_all::<AccountFields>(source.accounts_table)
        .await?;
    let usernames: HashMap<String, String> = accounts
        .into_iter()
        .filter_map(|r| r.fields.username.map(|u| (r.id, u)))
        .collect();

    let reels = store.list_all::<ReelFields>(source.reels_table).await?;
    let mut stats = NotifyStats {
        evaluated: reels.len(),
        ..NotifyStats::default()
    };

    for record in reels {
        if !should_notify(&record.fields, threshold_pct) {
            continue;
        }

        let username = record
            .fields
            .account_id()
            .and_then(|id| usernames.get(id))
            .map_or("", String::as_str);
        let text = notification_text(username, &record.fields);

        let delivered = deliver(telegram, &chat, &record.fields, &text, &mut stats).await;
        if !delivered {
            stats.delivery_failures += 1;
        }

        // Flag-once-attempted: mark regardless of delivery outcome.
        let patch = RecordPatch::new(&record.id, json!({ NOTIFIED_FIELD: true }));
        if let Err(e) = store.patch(source.reels_table, &[patch]).await {
            tracing::error!(
                record = %record.id,
                error = %e,
                "failed to mark reel as notified"
            );
            stats.flag_failures += 1;
        }
    }

    tracing::info!(
        evaluated = stats.evaluated,
        videos = stats.sent_video,
        texts = stats.sent_text,
        delivery_failures = stats.delivery_failures,
        flag_failures = stats.flag_failures,
        "notify finished"
    );
    Ok(stats)
}

/// Attempts rich delivery, falling back to a degraded text message.
/// Returns whether anything reached the chat.
async fn deliver(
    telegram: &TelegramClient,
    chat: &str,
    fields: &ReelFields,
    text: &str,
    stats: &mut NotifyStats,
) -> bool {
    let code = fields.reel_id.as_deref().unwrap_or_default();

    let video = if fields.download_link.is_empty() {
        None
    } else {
        match telegram.download(&fields.download_link).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!(reel = %code, error = %e, "video download failed");
                None
            }
        }
    };

    if let Some(bytes) = video {
        let filename = format!("{code}.mp4");
        match telegram.send_video(chat, bytes, &filename, text).await {
            Ok(()) => {
                tracing::info!(reel = %code, "sent video notification");
                stats.sent_video += 1;
                return true;
            }
            Err(e) => {
                tracing::error!(reel = %code, error = %e, "video upload failed");
            }
        }
    }

    let degraded = format!("{text}\n\nVideo link expired.");
    match telegram.send_message(chat, &degraded).await {
        Ok(()) => {
            tracing::info!(reel = %code, "sent text notification");
            stats.sent_text += 1;
            true
        }
        Err(e) => {
            tracing::error!(reel = %code, error = %e, "text notification failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reel(score: f64, notified: bool) -> ReelFields {
        ReelFields {
            reel_id: Some("ABC123".to_string()),
            virality_score: score,
            virality_notified: notified,
            views: 4500,
            like_count: 100,
            comment_count: 3,
            caption: "big day".to_string(),
            ..ReelFields::default()
        }
    }

    #[test]
    fn notifies_above_threshold_when_unflagged() {
        assert!(should_notify(&reel(0.6, false), 50.0));
    }

    #[test]
    fn threshold_is_inclusive() {
        assert!(should_notify(&reel(0.5, false), 50.0));
    }

    #[test]
    fn below_threshold_is_quiet() {
        assert!(!should_notify(&reel(0.4, false), 50.0));
    }

    #[test]
    fn already_notified_stays_quiet() {
        assert!(!should_notify(&reel(0.9, true), 50.0));
    }

    #[test]
    fn text_includes_link_and_counts() {
        let text = notification_text("creator", &reel(0.6, false));
        assert!(text.contains("@creator"));
        assert!(text.contains("+60.00% over avg"));
        assert!(text.contains("Views: 4500"));
        assert!(text.contains("https://www.instagram.com/reel/ABC123"));
        assert!(text.contains("big day"));
    }
}
