use std::time::Duration;

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::AirtableError;
use crate::types::{CreateRecord, ListResponse, Record, RecordPatch, RecordsEnvelope};

const DEFAULT_BASE_URL: &str = "https://api.airtable.com/v0";

/// Maximum number of pages to follow in a single table listing.
/// Prevents infinite loops on a cycling continuation token.
const MAX_PAGES: usize = 200;

/// Maximum records per PATCH request, imposed by the store.
pub const MAX_PATCH_RECORDS: usize = 10;

/// Client for the Airtable REST API, scoped to one base.
///
/// Use [`AirtableClient::new`] for production or
/// [`AirtableClient::with_base_url`] to point at a mock server in tests.
pub struct AirtableClient {
    client: Client,
    api_key: String,
    base_url: Url,
    base_id: String,
}

impl AirtableClient {
    /// Creates a client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`AirtableError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(api_key: &str, base_id: &str, timeout_secs: u64) -> Result<Self, AirtableError> {
        Self::with_base_url(api_key, base_id, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`AirtableError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`AirtableError::Api`] if `base_url` is not
    /// a valid URL.
    pub fn with_base_url(
        api_key: &str,
        base_id: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, AirtableError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("reelsync/0.1 (reel-analytics)")
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised)
            .map_err(|e| AirtableError::Api(format!("invalid base URL '{base_url}': {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
            base_id: base_id.to_owned(),
        })
    }

    /// Lists every record in `table`, following the `offset` continuation
    /// token until the store stops returning one.
    ///
    /// Loop guard: a response that echoes back the offset we just sent
    /// terminates pagination instead of re-requesting the same page forever.
    ///
    /// # Errors
    ///
    /// - [`AirtableError::UnexpectedStatus`] on any non-2xx response.
    /// - [`AirtableError::Deserialize`] if a page body does not match the
    ///   expected shape.
    /// - [`AirtableError::PaginationLimit`] after [`MAX_PAGES`] pages.
    /// - [`AirtableError::Http`] on network failure.
    pub async fn list_all<T: DeserializeOwned>(
        &self,
        table: &str,
    ) -> Result<Vec<Record<T>>, AirtableError> {
        let mut records: Vec<Record<T>> = Vec::new();
        let mut offset: Option<String> = None;
        let mut page_count = 0usize;

        loop {
            page_count += 1;
            if page_count > MAX_PAGES {
                return Err(AirtableError::PaginationLimit {
                    table: table.to_owned(),
                    max_pages: MAX_PAGES,
                });
            }

            let mut url = self.table_url(table)?;
            if let Some(cursor) = &offset {
                url.query_pairs_mut().append_pair("offset", cursor);
            }

            let body = self.send_checked(self.client.get(url.clone()), table).await?;
            let page: ListResponse<T> =
                serde_json::from_str(&body).map_err(|e| AirtableError::Deserialize {
                    context: format!("list page {page_count} of table '{table}'"),
                    source: e,
                })?;

            tracing::debug!(
                table,
                page = page_count,
                records = page.records.len(),
                "fetched table page"
            );
            records.extend(page.records);

            match page.offset {
                Some(next) if Some(&next) == offset.as_ref() => {
                    tracing::warn!(table, offset = %next, "offset did not advance; stopping pagination");
                    break;
                }
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        Ok(records)
    }

    /// Creates one record in `table` and returns its store-assigned id.
    ///
    /// # Errors
    ///
    /// - [`AirtableError::UnknownFieldName`] if the base rejects a field name.
    /// - [`AirtableError::UnexpectedStatus`] on any other non-2xx response.
    /// - [`AirtableError::Deserialize`] / [`AirtableError::Api`] if the
    ///   response does not echo the created record.
    /// - [`AirtableError::Http`] on network failure.
    pub async fn create<T: Serialize>(
        &self,
        table: &str,
        fields: &T,
    ) -> Result<String, AirtableError> {
        let url = self.table_url(table)?;
        let payload = RecordsEnvelope {
            records: vec![CreateRecord { fields }],
        };

        let body = self
            .send_checked(self.client.post(url).json(&payload), table)
            .await?;
        let created: ListResponse<serde_json::Value> =
            serde_json::from_str(&body).map_err(|e| AirtableError::Deserialize {
                context: format!("create response from table '{table}'"),
                source: e,
            })?;

        created
            .records
            .into_iter()
            .next()
            .map(|r| r.id)
            .ok_or_else(|| {
                AirtableError::Api(format!("create into '{table}' returned no records"))
            })
    }

    /// Patches up to [`MAX_PATCH_RECORDS`] records in one request.
    ///
    /// Callers with more records chunk and decide per chunk whether to
    /// continue; the store applies a batch atomically.
    ///
    /// # Errors
    ///
    /// - [`AirtableError::Api`] if `patches` exceeds the batch limit or is
    ///   empty.
    /// - [`AirtableError::UnknownFieldName`] if the base rejects a field name.
    /// - [`AirtableError::UnexpectedStatus`] on any other non-2xx response.
    /// - [`AirtableError::Http`] on network failure.
    pub async fn patch(&self, table: &str, patches: &[RecordPatch]) -> Result<(), AirtableError> {
        if patches.is_empty() {
            return Err(AirtableError::Api("patch called with no records".into()));
        }
        if patches.len() > MAX_PATCH_RECORDS {
            return Err(AirtableError::Api(format!(
                "patch called with {} records; the store accepts at most {MAX_PATCH_RECORDS}",
                patches.len()
            )));
        }

        let url = self.table_url(table)?;
        let payload = RecordsEnvelope {
            records: patches.to_vec(),
        };
        self.send_checked(self.client.patch(url).json(&payload), table)
            .await?;
        Ok(())
    }

    /// Builds the URL for `table`, percent-encoding the table name as a path
    /// segment (table names contain spaces).
    fn table_url(&self, table: &str) -> Result<Url, AirtableError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| AirtableError::Api(format!("base URL '{}' cannot be a base", self.base_url)))?
            .push(&self.base_id)
            .push(table);
        Ok(url)
    }

    /// Sends a request with auth, maps non-2xx statuses to typed errors, and
    /// returns the response body.
    async fn send_checked(
        &self,
        request: reqwest::RequestBuilder,
        table: &str,
    ) -> Result<String, AirtableError> {
        let response = request.bearer_auth(&self.api_key).send().await?;
        let status = response.status();
        let url = response.url().to_string();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }

        if status == reqwest::StatusCode::UNPROCESSABLE_ENTITY && body.contains("UNKNOWN_FIELD_NAME")
        {
            return Err(AirtableError::UnknownFieldName {
                table: table.to_owned(),
                body,
            });
        }

        Err(AirtableError::UnexpectedStatus {
            status: status.as_u16(),
            url,
            body,
        })
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
