//! Provider response shapes.
//!
//! Items inside a reels page are kept as raw JSON values: one malformed
//! item must never abort an account's ingestion loop, so per-item typing
//! happens through [`parse_reel_item`] and the caller decides what to do
//! with the failure.

use serde::Deserialize;
use serde_json::Value;

/// Profile snapshot from the `user_info` endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub biography: String,
    #[serde(default)]
    pub external_url: Option<String>,
    #[serde(default)]
    pub follower_count: i64,
    #[serde(default)]
    pub following_count: i64,
    #[serde(default)]
    pub media_count: i64,
    #[serde(default)]
    pub hd_profile_pic_url_info: Option<PicUrlInfo>,
}

impl UserInfo {
    /// URL of the HD profile picture, when the provider included one.
    #[must_use]
    pub fn profile_pic_url(&self) -> Option<&str> {
        self.hd_profile_pic_url_info.as_ref().map(|p| p.url.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PicUrlInfo {
    pub url: String,
}

/// One page of a user's reels plus the already-guarded next cursor.
///
/// `next_max_id == None` means pagination is exhausted.
#[derive(Debug)]
pub struct ReelsPage {
    pub items: Vec<Value>,
    pub next_max_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ReelsData {
    #[serde(default)]
    pub items: Vec<Value>,
    #[serde(default)]
    pub paging_info: PagingInfo,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PagingInfo {
    #[serde(default)]
    pub more_available: bool,
    #[serde(default)]
    pub max_id: Option<String>,
}

/// Decides the continuation token for the next reels page.
///
/// Returns `None` (stop paginating) when the provider says no more pages
/// are available, when it offers no token, or when the offered token equals
/// the one just sent — the loop guard against a non-advancing provider.
#[must_use]
pub fn next_cursor(sent: Option<&str>, more_available: bool, offered: Option<&str>) -> Option<String> {
    if !more_available {
        return None;
    }
    match offered {
        None => None,
        Some(token) if Some(token) == sent => None,
        Some(token) => Some(token.to_owned()),
    }
}

/// The media payload of one reels-page item.
#[derive(Debug, Clone, Deserialize)]
pub struct ReelMedia {
    /// External content id; the dedup key. Items without one are skipped.
    #[serde(default)]
    pub code: Option<String>,
    /// Posting time as a unix timestamp. Required: an item without it is
    /// malformed.
    pub taken_at: i64,
    #[serde(default)]
    pub caption: Option<Caption>,
    #[serde(default)]
    pub comment_count: i64,
    #[serde(default)]
    pub play_count: i64,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub video_versions: Vec<VideoVersion>,
}

impl ReelMedia {
    #[must_use]
    pub fn caption_text(&self) -> &str {
        self.caption.as_ref().map_or("", |c| c.text.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Caption {
    #[serde(default)]
    pub text: String,
}

/// One downloadable rendition of a reel's video.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoVersion {
    #[serde(default)]
    pub height: i64,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct ReelItem {
    media: ReelMedia,
}

/// Types one raw reels-page item.
///
/// # Errors
///
/// Returns the `serde_json` error when the item lacks the expected `media`
/// shape; callers log and skip the single item.
pub fn parse_reel_item(item: &Value) -> Result<ReelMedia, serde_json::Error> {
    serde_json::from_value::<ReelItem>(item.clone()).map(|i| i.media)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_cursor_stops_when_no_more_available() {
        assert_eq!(next_cursor(None, false, Some("abc")), None);
    }

    #[test]
    fn next_cursor_stops_without_a_token() {
        assert_eq!(next_cursor(Some("abc"), true, None), None);
    }

    #[test]
    fn next_cursor_stops_on_repeated_token() {
        assert_eq!(next_cursor(Some("abc"), true, Some("abc")), None);
    }

    #[test]
    fn next_cursor_advances_on_fresh_token() {
        assert_eq!(
            next_cursor(Some("abc"), true, Some("def")),
            Some("def".to_string())
        );
    }

    #[test]
    fn next_cursor_advances_from_first_page() {
        assert_eq!(next_cursor(None, true, Some("abc")), Some("abc".to_string()));
    }

    #[test]
    fn parse_reel_item_reads_nested_media() {
        let item = serde_json::json!({
            "media": {
                "code": "ABC123",
                "taken_at": 1_748_736_000,
                "caption": {"text": "hello"},
                "play_count": 4500,
                "like_count": 100,
                "comment_count": 3,
                "video_versions": [
                    {"height": 480, "url": "https://cdn.example/480.mp4"},
                    {"height": 720, "url": "https://cdn.example/720.mp4"}
                ]
            }
        });
        let media = parse_reel_item(&item).unwrap();
        assert_eq!(media.code.as_deref(), Some("ABC123"));
        assert_eq!(media.caption_text(), "hello");
        assert_eq!(media.video_versions.len(), 2);
    }

    #[test]
    fn parse_reel_item_without_media_is_an_error() {
        let item = serde_json::json!({"not_media": {}});
        assert!(parse_reel_item(&item).is_err());
    }

    #[test]
    fn parse_reel_item_without_taken_at_is_an_error() {
        let item = serde_json::json!({"media": {"code": "ABC123"}});
        assert!(parse_reel_item(&item).is_err());
    }
}
