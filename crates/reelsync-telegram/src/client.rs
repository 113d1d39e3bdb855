use std::time::Duration;

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::error::TelegramError;

const DEFAULT_BASE_URL: &str = "https://api.telegram.org";

/// Response envelope shared by all Bot API methods.
#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    migrate_to_chat_id: Option<i64>,
}

/// Client for one bot token.
///
/// Chat ids are strings throughout: the Bot API accepts both numeric ids
/// and `@channel` names, and migration swaps the numeric id mid-run.
pub struct TelegramClient {
    client: Client,
    bot_token: String,
    base_url: Url,
}

impl TelegramClient {
    /// Creates a client pointed at the production Bot API.
    ///
    /// # Errors
    ///
    /// Returns [`TelegramError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(bot_token: &str, timeout_secs: u64) -> Result<Self, TelegramError> {
        Self::with_base_url(bot_token, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`TelegramError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`TelegramError::InvalidBaseUrl`] if
    /// `base_url` does not parse.
    pub fn with_base_url(
        bot_token: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, TelegramError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("reelsync/0.1 (reel-analytics)")
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let parsed = Url::parse(&normalised).map_err(|e| TelegramError::InvalidBaseUrl {
            base_url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            bot_token: bot_token.to_owned(),
            base_url: parsed,
        })
    }

    /// Sends a plain text message.
    ///
    /// # Errors
    ///
    /// [`TelegramError::Api`] when the Bot API answers `ok: false`;
    /// [`TelegramError::Http`] / [`TelegramError::Deserialize`] on
    /// transport or body-shape failures.
    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), TelegramError> {
        let envelope = self
            .call(
                "sendMessage",
                Form::new()
                    .text("chat_id", chat_id.to_owned())
                    .text("text", text.to_owned()),
            )
            .await?;
        Self::require_ok(&envelope)
    }

    /// Uploads `video` with a caption.
    ///
    /// # Errors
    ///
    /// Same as [`TelegramClient::send_message`].
    pub async fn send_video(
        &self,
        chat_id: &str,
        video: Bytes,
        filename: &str,
        caption: &str,
    ) -> Result<(), TelegramError> {
        let part = Part::bytes(video.to_vec())
            .file_name(filename.to_owned())
            .mime_str("video/mp4")?;
        let form = Form::new()
            .text("chat_id", chat_id.to_owned())
            .text("caption", caption.to_owned())
            .part("video", part);

        let envelope = self.call("sendVideo", form).await?;
        Self::require_ok(&envelope)
    }

    /// Resolves the usable chat id before a delivery loop.
    ///
    /// Sends a probe message to `chat_id`. When the chat has been migrated
    /// to a supergroup, the Bot API rejects the probe but names the
    /// replacement id; the replacement is probed once and adopted for the
    /// remainder of the run.
    ///
    /// # Errors
    ///
    /// [`TelegramError::ChatUnavailable`] when neither the configured chat
    /// nor a migration target accepts the probe.
    pub async fn resolve_chat(&self, chat_id: &str) -> Result<String, TelegramError> {
        let envelope = self
            .call(
                "sendMessage",
                Form::new()
                    .text("chat_id", chat_id.to_owned())
                    .text("text", "reelsync online".to_owned()),
            )
            .await?;

        if envelope.ok {
            return Ok(chat_id.to_owned());
        }

        let migrated = envelope
            .parameters
            .as_ref()
            .and_then(|p| p.migrate_to_chat_id);
        if let Some(new_id) = migrated {
            let new_id = new_id.to_string();
            tracing::info!(old = chat_id, new = %new_id, "chat migrated; adopting new id");
            let probe = self
                .call(
                    "sendMessage",
                    Form::new()
                        .text("chat_id", new_id.clone())
                        .text("text", "reelsync online".to_owned()),
                )
                .await?;
            if probe.ok {
                return Ok(new_id);
            }
            return Err(TelegramError::ChatUnavailable {
                chat_id: new_id,
                description: probe
                    .description
                    .unwrap_or_else(|| "probe rejected".to_owned()),
            });
        }

        Err(TelegramError::ChatUnavailable {
            chat_id: chat_id.to_owned(),
            description: envelope
                .description
                .unwrap_or_else(|| "probe rejected".to_owned()),
        })
    }

    /// Downloads media bytes from an arbitrary URL (reel CDN links).
    ///
    /// # Errors
    ///
    /// [`TelegramError::Http`] on network failure or non-2xx status.
    pub async fn download(&self, url: &str) -> Result<Bytes, TelegramError> {
        let response = self.client.get(url).send().await?;
        let response = response.error_for_status()?;
        Ok(response.bytes().await?)
    }

    /// POSTs a Bot API method and parses the response envelope. Non-2xx
    /// statuses are not an error here: the Bot API reports failures inside
    /// the envelope (with a 4xx status) and callers need the envelope to
    /// see migration parameters.
    async fn call(&self, api_method: &str, form: Form) -> Result<ApiEnvelope, TelegramError> {
        let url = self.method_url(api_method)?;
        let response = self.client.post(url.clone()).multipart(form).send().await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| TelegramError::Deserialize {
            context: format!("{api_method} response"),
            source: e,
        })
    }

    fn method_url(&self, api_method: &str) -> Result<Url, TelegramError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| TelegramError::InvalidBaseUrl {
                base_url: self.base_url.to_string(),
                reason: "cannot be a base".to_owned(),
            })?
            .push(&format!("bot{}", self.bot_token))
            .push(api_method);
        Ok(url)
    }

    fn require_ok(envelope: &ApiEnvelope) -> Result<(), TelegramError> {
        if envelope.ok {
            Ok(())
        } else {
            Err(TelegramError::Api {
                description: envelope
                    .description
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_owned()),
            })
        }
    }
}
