//! Client for the Telegram Bot API.
//!
//! Supports plain text messages, video uploads with captions, media
//! download, and the one-time chat-migration resolution the notifier runs
//! before its delivery loop (supergroup upgrades move a chat to a new id
//! and the old one stops accepting messages).

pub mod client;
pub mod error;

pub use client::TelegramClient;
pub use error::TelegramError;
