use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Airtable(#[from] reelsync_airtable::AirtableError),

    #[error(transparent)]
    Instagram(#[from] reelsync_instagram::InstagramError),

    #[error(transparent)]
    Telegram(#[from] reelsync_telegram::TelegramError),

    #[error(transparent)]
    Config(#[from] reelsync_core::ConfigError),
}
