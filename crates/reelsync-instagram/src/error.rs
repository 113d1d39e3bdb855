use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstagramError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The provider's `data` envelope was missing or not an object. The full
    /// body is carried for diagnosability; these responses change shape when
    /// the upstream scraper misbehaves.
    #[error("missing or malformed 'data' for user {username}: {body}")]
    MalformedData { username: String, body: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },
}
