//! The shared capability surface of every storage backend.
//!
//! A database destination implements all of it; an HTTP origin implements the
//! write half as no-ops so orchestration code can treat both uniformly.

pub mod batch;
pub mod database;
pub mod https;
pub mod ledger;

use crate::error::StorageError;
use async_trait::async_trait;
use model::{
    core::structure::TableStructure,
    records::row::Row,
    transform::mapping::{FieldMap, FilterMap},
};

/// Outcome of a `store`, `stream` or `flush` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreInfo {
    /// Rows accepted into the buffer.
    pub rows: usize,
    /// Rows lost to failed bulk inserts during this call.
    pub failed_rows: usize,
    /// Largest buffer footprint observed, in bytes.
    pub memory_peak: usize,
    /// First and last record as received, before normalization.
    pub first: Option<Row>,
    pub last: Option<Row>,
}

impl StoreInfo {
    /// Folds a later call's outcome into this one.
    pub fn absorb(&mut self, other: StoreInfo) {
        self.rows += other.rows;
        self.failed_rows += other.failed_rows;
        self.memory_peak = self.memory_peak.max(other.memory_peak);
        if self.first.is_none() {
            self.first = other.first;
        }
        if other.last.is_some() {
            self.last = other.last;
        }
    }
}

#[async_trait]
pub trait Storage: Send {
    /// Creates or evolves `table` so it holds every column of `structure`.
    async fn prepare(&mut self, table: &str, structure: &TableStructure) -> Result<(), StorageError>;

    /// Normalizes and buffers `rows` for `table`, flushing whenever the
    /// buffer fills. Rows still buffered on return are written by a later
    /// flush, table switch or `end`.
    async fn store(
        &mut self,
        table: &str,
        fields: &FieldMap,
        structure: &TableStructure,
        rows: Vec<Row>,
        filters: &FilterMap,
    ) -> Result<StoreInfo, StorageError>;

    /// Buffers a single row for the prepared table. With `is_final`, the
    /// buffer is written out afterwards.
    async fn stream(
        &mut self,
        row: Row,
        structure: &TableStructure,
        is_final: bool,
    ) -> Result<StoreInfo, StorageError>;

    /// Writes out whatever is buffered.
    async fn flush(&mut self) -> Result<StoreInfo, StorageError>;

    /// Opens a run: relaxes foreign key and uniqueness checks.
    async fn begin(&mut self) -> Result<(), StorageError>;

    /// Closes a run: flushes, then restores the checks.
    async fn end(&mut self) -> Result<(), StorageError>;

    /// Whether `table` exists and has every one of `columns`.
    async fn exists(&self, table: &str, columns: &[String]) -> Result<bool, StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::core::value::Value;

    fn row(id: i64) -> Row {
        let mut row = Row::new();
        row.insert("id", Value::Int(id));
        row
    }

    #[test]
    fn test_absorb_keeps_first_and_latest_last() {
        let mut info = StoreInfo {
            rows: 2,
            memory_peak: 10,
            first: Some(row(1)),
            last: Some(row(2)),
            ..Default::default()
        };
        info.absorb(StoreInfo {
            rows: 1,
            failed_rows: 3,
            memory_peak: 4,
            first: Some(row(3)),
            last: Some(row(3)),
        });

        assert_eq!(info.rows, 3);
        assert_eq!(info.failed_rows, 3);
        assert_eq!(info.memory_peak, 10);
        assert_eq!(info.first, Some(row(1)));
        assert_eq!(info.last, Some(row(3)));
    }
}
