//! Client for the RapidAPI real-time Instagram scraper.
//!
//! Two endpoints are used: `user_info` for profile snapshots and
//! `user_reels` for paginated reel listings. The reels endpoint has been
//! observed with two different continuation contracts (a top-level `max_id`
//! echoed next to the envelope, and a `paging_info.max_id` with a
//! `more_available` flag); [`types::next_cursor`] supports both and guards
//! against a non-advancing token.

pub mod client;
pub mod error;
pub mod retry;
pub mod types;

pub use client::InstagramClient;
pub use error::InstagramError;
pub use types::{next_cursor, parse_reel_item, ReelMedia, ReelsPage, UserInfo, VideoVersion};
