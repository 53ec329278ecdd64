//! Record representations shared between the hot store and the archive store

use serde_json::{Map, Value};

/// Field added to every record when it is written to the warm tier.
pub const ARCHIVED_AT_FIELD: &str = "archived_at";

/// One row selected from the hot store, ready to archive.
///
/// `fields` carries every column of the row (including `id`) as JSON;
/// `id` and `timestamp` are lifted out because the archiver needs them
/// for deletion and cursor tracking.
#[derive(Debug, Clone, PartialEq)]
pub struct HotRecord {
    /// Primary key in the hot table.
    pub id: i64,
    /// Raw value of the category's age column, as stored.
    pub timestamp: String,
    /// Full row contents.
    pub fields: Map<String, Value>,
}

impl HotRecord {
    /// The row as it will appear in the warm tier: all original fields
    /// plus `archived_at`.
    pub fn archived_fields(&self, archived_at: &str) -> Map<String, Value> {
        let mut fields = self.fields.clone();
        fields.insert(
            ARCHIVED_AT_FIELD.to_string(),
            Value::String(archived_at.to_string()),
        );
        fields
    }
}

/// Resumable pagination cursor: the age column and id of the last record
/// seen, with ties broken by id. Re-issuing a selection with the same
/// cursor yields the same batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    /// Age-column value of the last record in the previous batch.
    pub timestamp: String,
    /// Id of the last record in the previous batch.
    pub id: i64,
}

impl Cursor {
    /// Cursor pointing just past the given record.
    pub fn after(record: &HotRecord) -> Self {
        Self {
            timestamp: record.timestamp.clone(),
            id: record.id,
        }
    }
}
