use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One stored record: the store-assigned id plus its field map, typed by
/// the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct Record<T> {
    pub id: String,
    pub fields: T,
}

/// One page of a table listing. `offset` is the opaque continuation token;
/// absent on the last page.
#[derive(Debug, Deserialize)]
pub(crate) struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub records: Vec<Record<T>>,
    #[serde(default)]
    pub offset: Option<String>,
}

/// An id plus the fields to overwrite on it.
///
/// Fields are an untyped JSON map because aggregation writes through a
/// runtime-resolved field name.
#[derive(Debug, Clone, Serialize)]
pub struct RecordPatch {
    pub id: String,
    pub fields: Value,
}

impl RecordPatch {
    #[must_use]
    pub fn new(id: impl Into<String>, fields: Value) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

/// Request envelope shared by create and patch calls.
#[derive(Debug, Serialize)]
pub(crate) struct RecordsEnvelope<T> {
    pub records: Vec<T>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateRecord<'a, T> {
    pub fields: &'a T,
}
