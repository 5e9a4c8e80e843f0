use crate::core::value::Value;
use serde::{Deserialize, Serialize};

/// Resume point for a paginated pull, derived from the last page.
///
/// `rows == 0` is the exhaustion signal: the resource has no more records
/// past `last_id`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct PullCursor {
    pub last_id: Option<String>,
    pub rows: usize,
}

impl PullCursor {
    pub fn new(last_id: Option<String>, rows: usize) -> Self {
        Self { last_id, rows }
    }

    /// Reads `id_field` out of the last raw record of a page.
    pub fn from_last(last: Option<&serde_json::Value>, id_field: &str, rows: usize) -> Self {
        let last_id = last
            .and_then(|record| record.get(id_field))
            .and_then(|id| Value::from(id.clone()).as_string());
        Self { last_id, rows }
    }

    pub fn is_exhausted(&self) -> bool {
        self.rows == 0
    }
}
