//! REST client for the Airtable record store.
//!
//! Collections ("tables") are listed with offset-cursor pagination, records
//! are created one at a time, and updates go out as batched PATCH requests.
//! Schema drift on write surfaces as [`AirtableError::UnknownFieldName`] so
//! callers can abort a write loop that targets a field the base no longer
//! has.

pub mod client;
pub mod error;
pub mod types;

pub use client::{AirtableClient, MAX_PATCH_RECORDS};
pub use error::AirtableError;
pub use types::{Record, RecordPatch};
