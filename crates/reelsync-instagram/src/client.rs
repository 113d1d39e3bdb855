use std::time::Duration;

use reqwest::{Client, Url};

use crate::error::InstagramError;
use crate::retry::retry_with_backoff;
use crate::types::{next_cursor, ReelsData, ReelsPage, UserInfo};

const DEFAULT_BASE_URL: &str = "https://real-time-instagram-scraper-api1.p.rapidapi.com";

/// Client for the RapidAPI Instagram scraper.
///
/// Sends the `x-rapidapi-key` and `x-rapidapi-host` headers on every
/// request; the host header is derived from the base URL so tests against a
/// mock server need no special casing.
pub struct InstagramClient {
    client: Client,
    api_key: String,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl InstagramClient {
    /// Creates a client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`InstagramError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        api_key: &str,
        timeout_secs: u64,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, InstagramError> {
        Self::with_base_url(api_key, timeout_secs, max_retries, backoff_base_ms, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`InstagramError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`InstagramError::InvalidBaseUrl`] if
    /// `base_url` does not parse.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        max_retries: u32,
        backoff_base_ms: u64,
        base_url: &str,
    ) -> Result<Self, InstagramError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("reelsync/0.1 (reel-analytics)")
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let parsed = Url::parse(&normalised).map_err(|e| InstagramError::InvalidBaseUrl {
            base_url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url: parsed,
            max_retries,
            backoff_base_ms,
        })
    }

    /// Fetches the profile snapshot for `username`.
    ///
    /// # Errors
    ///
    /// - [`InstagramError::MalformedData`] when `data` is missing or not an
    ///   object (carries the full body).
    /// - [`InstagramError::UnexpectedStatus`] on non-2xx after retries.
    /// - [`InstagramError::Http`] on network failure after retries.
    /// - [`InstagramError::Deserialize`] when the body is not JSON.
    pub async fn user_info(&self, username: &str) -> Result<UserInfo, InstagramError> {
        let url = self.endpoint_url("v1/user_info", username, None);
        let data = self.fetch_data_envelope(url, username).await?;
        serde_json::from_value(data).map_err(|e| InstagramError::Deserialize {
            context: format!("user_info({username})"),
            source: e,
        })
    }

    /// Fetches one page of `username`'s reels.
    ///
    /// The returned [`ReelsPage::next_max_id`] is already loop-guarded: it
    /// is `None` when the provider signalled exhaustion, offered no token,
    /// or echoed back the token that was just sent. The token is read from
    /// `paging_info.max_id`, falling back to the top-level `max_id` used by
    /// the other observed response shape.
    ///
    /// # Errors
    ///
    /// Same as [`InstagramClient::user_info`].
    pub async fn user_reels_page(
        &self,
        username: &str,
        max_id: Option<&str>,
    ) -> Result<ReelsPage, InstagramError> {
        let url = self.endpoint_url("v1/user_reels", username, max_id);
        let body = self.request_json(url).await?;

        let data = body.get("data").cloned().unwrap_or(serde_json::Value::Null);
        if !data.is_object() {
            return Err(InstagramError::MalformedData {
                username: username.to_owned(),
                body: body.to_string(),
            });
        }

        // The top-level token sits outside the data envelope on one of the
        // two observed response shapes.
        let top_level_max_id = body
            .get("max_id")
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned);

        let data: ReelsData =
            serde_json::from_value(data).map_err(|e| InstagramError::Deserialize {
                context: format!("user_reels({username})"),
                source: e,
            })?;

        let offered = data.paging_info.max_id.or(top_level_max_id);
        let next_max_id = next_cursor(max_id, data.paging_info.more_available, offered.as_deref());

        Ok(ReelsPage {
            items: data.items,
            next_max_id,
        })
    }

    fn endpoint_url(&self, path: &str, username: &str, max_id: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.extend(path.split('/'));
        }
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("username_or_id", username);
            if let Some(cursor) = max_id {
                pairs.append_pair("max_id", cursor);
            }
        }
        url
    }

    /// GETs `url` with the RapidAPI headers, retrying transient failures,
    /// and parses the body as JSON.
    async fn request_json(&self, url: Url) -> Result<serde_json::Value, InstagramError> {
        let host = self.base_url.host_str().unwrap_or_default().to_owned();
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            let url = url.clone();
            let host = host.clone();
            async move {
                let response = self
                    .client
                    .get(url.clone())
                    .header("x-rapidapi-key", &self.api_key)
                    .header("x-rapidapi-host", host)
                    .send()
                    .await?;

                let status = response.status();
                if !status.is_success() {
                    return Err(InstagramError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }

                let body = response.text().await?;
                serde_json::from_str(&body).map_err(|e| InstagramError::Deserialize {
                    context: url.to_string(),
                    source: e,
                })
            }
        })
        .await
    }

    /// GETs `url` and unwraps the `data` object envelope.
    async fn fetch_data_envelope(
        &self,
        url: Url,
        username: &str,
    ) -> Result<serde_json::Value, InstagramError> {
        let body = self.request_json(url).await?;
        match body.get("data") {
            Some(data) if data.is_object() => Ok(data.clone()),
            _ => Err(InstagramError::MalformedData {
                username: username.to_owned(),
                body: body.to_string(),
            }),
        }
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
