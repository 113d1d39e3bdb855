/// Process-level configuration, loaded once at startup from environment
/// variables and passed by reference into each pipeline stage.
///
/// Per-run tunables that live in the store's settings table (virality
/// threshold, readiness thresholds, provider and messaging credentials)
/// are in [`crate::RunSettings`], not here.
#[derive(Clone)]
pub struct AppConfig {
    pub airtable_api_key: String,
    pub airtable_base_id: String,
    pub airtable_base_url: String,
    pub rapidapi_base_url: String,
    pub telegram_base_url: String,
    pub log_level: String,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    /// Maximum age in days of a reel eligible for ingestion.
    pub retention_days: i64,
    pub max_concurrent_accounts: usize,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("airtable_api_key", &"[redacted]")
            .field("airtable_base_id", &self.airtable_base_id)
            .field("airtable_base_url", &self.airtable_base_url)
            .field("rapidapi_base_url", &self.rapidapi_base_url)
            .field("telegram_base_url", &self.telegram_base_url)
            .field("log_level", &self.log_level)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("retention_days", &self.retention_days)
            .field("max_concurrent_accounts", &self.max_concurrent_accounts)
            .finish()
    }
}
