use thiserror::Error;

#[derive(Debug, Error)]
pub enum AirtableError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The base rejected a field name we tried to write. Retrying the same
    /// write loop is useless; the field genuinely does not exist.
    #[error("unknown field name writing to table {table}: {body}")]
    UnknownFieldName { table: String, body: String },

    #[error("unexpected HTTP status {status} from {url}: {body}")]
    UnexpectedStatus {
        status: u16,
        url: String,
        body: String,
    },

    #[error("pagination limit reached for table {table}: exceeded {max_pages} pages")]
    PaginationLimit { table: String, max_pages: usize },

    #[error("API contract violation: {0}")]
    Api(String),
}
