use super::pipeline::Transform;
use model::{core::value::Value, records::row::Row};
use std::collections::HashSet;

/// Keeps only the destination columns.
pub struct Projection {
    columns: HashSet<String>,
}

impl Projection {
    pub fn new(columns: &[String]) -> Self {
        Self {
            columns: columns.iter().cloned().collect(),
        }
    }
}

impl Transform for Projection {
    fn apply(&self, mut row: Row) -> Row {
        row.retain(|key, _| self.columns.contains(key));
        row
    }
}

/// Adds every destination column the row lacks, as null.
pub struct FillMissing {
    columns: Vec<String>,
}

impl FillMissing {
    pub fn new(columns: &[String]) -> Self {
        Self {
            columns: columns.to_vec(),
        }
    }
}

impl Transform for FillMissing {
    fn apply(&self, mut row: Row) -> Row {
        for column in &self.columns {
            if !row.contains(column) {
                row.insert(column.clone(), Value::Null);
            }
        }
        row
    }
}
