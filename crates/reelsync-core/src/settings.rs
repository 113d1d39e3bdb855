//! Typed view of the store's `Automation settings` table.
//!
//! The table holds `Name`/`Value` rows. They are fetched once per run and
//! parsed into [`RunSettings`] before any stage executes, so a missing or
//! malformed setting fails the whole run up front instead of surfacing
//! halfway through a pipeline stage.

use crate::ConfigError;

/// A `(posts, days)` pair gating a readiness transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadyThresholds {
    pub posts: i64,
    pub days: i64,
}

/// All per-run tunables and credentials read from the settings table.
#[derive(Clone)]
pub struct RunSettings {
    /// API key for the social-data provider.
    pub rapidapi_key: String,
    /// A reel is viral when `virality_score * 100 >= this`.
    pub virality_threshold_pct: f64,
    pub telegram_bot_token: String,
    /// Kept as a string: Telegram accepts both numeric ids and `@channel`
    /// names, and migration can swap the id mid-run.
    pub telegram_chat_id: String,
    pub swarm_ready: ReadyThresholds,
    pub growth_ready: ReadyThresholds,
}

impl std::fmt::Debug for RunSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunSettings")
            .field("rapidapi_key", &"[redacted]")
            .field("virality_threshold_pct", &self.virality_threshold_pct)
            .field("telegram_bot_token", &"[redacted]")
            .field("telegram_chat_id", &self.telegram_chat_id)
            .field("swarm_ready", &self.swarm_ready)
            .field("growth_ready", &self.growth_ready)
            .finish()
    }
}

impl RunSettings {
    /// Parse settings from `(name, value)` rows as listed from the store.
    ///
    /// Later rows win when a name repeats; rows with an empty name are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSetting`] when a required name is absent
    /// and [`ConfigError::InvalidSetting`] when a numeric value fails to
    /// parse.
    pub fn from_rows(rows: &[(String, String)]) -> Result<Self, ConfigError> {
        let get = |name: &str| -> Result<&str, ConfigError> {
            rows.iter()
                .rev()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str())
                .ok_or_else(|| ConfigError::MissingSetting(name.to_string()))
        };

        let parse_f64 = |name: &str| -> Result<f64, ConfigError> {
            get(name)?
                .trim()
                .parse::<f64>()
                .map_err(|e| ConfigError::InvalidSetting {
                    name: name.to_string(),
                    reason: e.to_string(),
                })
        };

        let parse_i64 = |name: &str| -> Result<i64, ConfigError> {
            get(name)?
                .trim()
                .parse::<i64>()
                .map_err(|e| ConfigError::InvalidSetting {
                    name: name.to_string(),
                    reason: e.to_string(),
                })
        };

        Ok(Self {
            rapidapi_key: get("RAPIDAPI_KEY")?.to_string(),
            virality_threshold_pct: parse_f64("VIRALITY_PERCENTAGE_TO_AVG")?,
            telegram_bot_token: get("TELEGRAM_BOT_API_KEY")?.to_string(),
            telegram_chat_id: get("TELEGRAM_GROUP_ID")?.trim().to_string(),
            swarm_ready: ReadyThresholds {
                posts: parse_i64("WHEN_SWARM_ACCOUNT_READY_POSTS")?,
                days: parse_i64("WHEN_SWARM_ACCOUNT_READY_DAYS")?,
            },
            growth_ready: ReadyThresholds {
                posts: parse_i64("WHEN_REEL_ACCOUNT_READY_POSTS")?,
                days: parse_i64("WHEN_REEL_ACCOUNT_READY_DAY")?,
            },
        })
    }
}
