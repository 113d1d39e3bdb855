//! Domain field shapes for the backing store's tables.
//!
//! The store omits empty fields from list responses, so every field is
//! defaulted on deserialization. Field structs carry the store's display
//! names via `#[serde(rename)]`; only the reel record keeps a flattened
//! extra-field map, because the virality field name has drifted in the
//! live base and the aggregation pass resolves it at runtime.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A parent-account collection and the reel collection it feeds.
///
/// Ingestion runs once per source set; the two sets share all code paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSet {
    pub name: &'static str,
    pub accounts_table: &'static str,
    pub reels_table: &'static str,
}

pub const AGENCY: SourceSet = SourceSet {
    name: "agency",
    accounts_table: "Agency Accounts",
    reels_table: "Agency Reels",
};

pub const COMPETITOR: SourceSet = SourceSet {
    name: "competitor",
    accounts_table: "Competitor Accounts",
    reels_table: "Competitor Reels",
};

pub const SWARM_TABLE: &str = "SWARM";
pub const SETTINGS_TABLE: &str = "Automation settings";

/// Fields of a parent account record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountFields {
    #[serde(rename = "Username", default)]
    pub username: Option<String>,
    #[serde(rename = "Followers", default)]
    pub followers: i64,
    #[serde(rename = "Account Status", default)]
    pub account_status: Option<String>,
    #[serde(rename = "Posts", default)]
    pub posts: i64,
    #[serde(rename = "Day", default)]
    pub day: i64,
}

/// Fields of a reel record as read back from the store.
///
/// `virality_score` reads the canonical field name; when the live schema
/// has drifted, the real value is reachable through `extra` and the
/// aggregation pass writes through the resolved name instead.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReelFields {
    #[serde(rename = "Reel ID", default)]
    pub reel_id: Option<String>,
    #[serde(rename = "Account", default)]
    pub account: Vec<String>,
    #[serde(rename = "Followers Snapshot", default)]
    pub followers_snapshot: i64,
    #[serde(rename = "Caption", default)]
    pub caption: String,
    #[serde(rename = "Comment count", default)]
    pub comment_count: i64,
    #[serde(rename = "Views", default)]
    pub views: i64,
    #[serde(rename = "Like count", default)]
    pub like_count: i64,
    #[serde(rename = "Date of posting", default)]
    pub date_of_posting: Option<NaiveDate>,
    #[serde(rename = "Download link", default)]
    pub download_link: String,
    #[serde(rename = "Virality score", default)]
    pub virality_score: f64,
    #[serde(rename = "Virality notified", default)]
    pub virality_notified: bool,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ReelFields {
    /// The record's owning account, when linked.
    #[must_use]
    pub fn account_id(&self) -> Option<&str> {
        self.account.first().map(String::as_str)
    }
}

/// Payload for creating a reel record.
///
/// Deliberately excludes `Virality score` and `Virality notified`: the
/// score is computed by a later pass through the runtime-resolved field
/// name, and the flag starts unset.
#[derive(Debug, Clone, Serialize)]
pub struct NewReel {
    #[serde(rename = "Account")]
    pub account: Vec<String>,
    #[serde(rename = "Followers Snapshot")]
    pub followers_snapshot: i64,
    #[serde(rename = "Caption")]
    pub caption: String,
    #[serde(rename = "Comment count")]
    pub comment_count: i64,
    #[serde(rename = "Views")]
    pub views: i64,
    #[serde(rename = "Like count")]
    pub like_count: i64,
    #[serde(rename = "Date of posting")]
    pub date_of_posting: NaiveDate,
    #[serde(rename = "Reel ID")]
    pub reel_id: String,
    #[serde(rename = "Download link")]
    pub download_link: String,
}

/// Fields of a swarm account record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SwarmFields {
    #[serde(rename = "Username", default)]
    pub username: Option<String>,
    #[serde(rename = "Post count", default)]
    pub post_count: i64,
    #[serde(rename = "Day", default)]
    pub day: i64,
    #[serde(rename = "Status", default)]
    pub status: Option<String>,
}

/// A `Name`/`Value` row of the settings table.
///
/// `Value` is a text column but numeric-looking values have been observed
/// to come back as JSON numbers, so both are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingFields {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Value", default, deserialize_with = "string_or_number")]
    pub value: String,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(f64),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Text(s) => Ok(s),
        Raw::Number(n) => {
            // Render integers without a trailing ".0" so ids survive.
            #[allow(clippy::cast_possible_truncation)]
            if n.fract() == 0.0 && n.abs() < 9e15 {
                Ok(format!("{}", n as i64))
            } else {
                Ok(n.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reel_fields_default_when_store_omits_them() {
        let fields: ReelFields = serde_json::from_value(serde_json::json!({
            "Reel ID": "DEF456",
            "Account": ["recAcc1"],
        }))
        .unwrap();
        assert_eq!(fields.reel_id.as_deref(), Some("DEF456"));
        assert_eq!(fields.account_id(), Some("recAcc1"));
        assert_eq!(fields.views, 0);
        assert!(!fields.virality_notified);
        assert!(fields.date_of_posting.is_none());
    }

    #[test]
    fn reel_fields_capture_unknown_names_in_extra() {
        let fields: ReelFields = serde_json::from_value(serde_json::json!({
            "Reel ID": "DEF456",
            "Virality score (%)": 1.25,
        }))
        .unwrap();
        assert!(fields.extra.contains_key("Virality score (%)"));
        assert!((fields.virality_score - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn new_reel_serializes_display_names_and_iso_date() {
        let reel = NewReel {
            account: vec!["recAcc1".to_string()],
            followers_snapshot: 1200,
            caption: "hello".to_string(),
            comment_count: 3,
            views: 4500,
            like_count: 100,
            date_of_posting: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            reel_id: "ABC123".to_string(),
            download_link: "https://cdn.example/v.mp4".to_string(),
        };
        let value = serde_json::to_value(&reel).unwrap();
        assert_eq!(value["Reel ID"], "ABC123");
        assert_eq!(value["Date of posting"], "2025-06-01");
        assert!(value.get("Virality score").is_none());
        assert!(value.get("Virality notified").is_none());
    }

    #[test]
    fn setting_value_accepts_numbers() {
        let row: SettingFields = serde_json::from_value(serde_json::json!({
            "Name": "TELEGRAM_GROUP_ID",
            "Value": -1001234,
        }))
        .unwrap();
        assert_eq!(row.value, "-1001234");
    }

    #[test]
    fn setting_value_accepts_text() {
        let row: SettingFields = serde_json::from_value(serde_json::json!({
            "Name": "RAPIDAPI_KEY",
            "Value": "rapid-test",
        }))
        .unwrap();
        assert_eq!(row.value, "rapid-test");
    }
}
