use crate::app_config::AppConfig;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the
/// process, without touching `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// The parsing/validation logic is decoupled from the actual environment so it
/// can be tested with a pure `HashMap` lookup — no `set_var`/`remove_var`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_i64 = |var: &str, default: &str| -> Result<i64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<i64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let airtable_api_key = require("AIRTABLE_API_KEY")?;
    let airtable_base_id = require("AIRTABLE_BASE_ID")?;

    let airtable_base_url = or_default("REELSYNC_AIRTABLE_BASE_URL", "https://api.airtable.com/v0");
    let rapidapi_base_url = or_default(
        "REELSYNC_RAPIDAPI_BASE_URL",
        "https://real-time-instagram-scraper-api1.p.rapidapi.com",
    );
    let telegram_base_url = or_default("REELSYNC_TELEGRAM_BASE_URL", "https://api.telegram.org");

    let log_level = or_default("REELSYNC_LOG_LEVEL", "info");
    let request_timeout_secs = parse_u64("REELSYNC_REQUEST_TIMEOUT_SECS", "15")?;
    let max_retries = parse_u32("REELSYNC_MAX_RETRIES", "2")?;
    let retry_backoff_base_ms = parse_u64("REELSYNC_RETRY_BACKOFF_BASE_MS", "1000")?;
    let retention_days = parse_i64("REELSYNC_RETENTION_DAYS", "30")?;
    let max_concurrent_accounts = parse_usize("REELSYNC_MAX_CONCURRENT_ACCOUNTS", "1")?;

    Ok(AppConfig {
        airtable_api_key,
        airtable_base_id,
        airtable_base_url,
        rapidapi_base_url,
        telegram_base_url,
        log_level,
        request_timeout_secs,
        max_retries,
        retry_backoff_base_ms,
        retention_days,
        max_concurrent_accounts,
    })
}
