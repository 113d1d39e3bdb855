use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The Bot API answered `ok: false` without a migration hint.
    #[error("Telegram API error: {description}")]
    Api { description: String },

    /// Neither the configured chat id nor a migration target accepted the
    /// probe message; notification delivery cannot proceed this run.
    #[error("chat {chat_id} is unavailable: {description}")]
    ChatUnavailable { chat_id: String, description: String },

    #[error("invalid base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },
}
