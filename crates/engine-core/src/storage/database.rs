use crate::{
    config::WriterConfig,
    error::StorageError,
    storage::{Storage, StoreInfo, batch::BatchState},
};
use async_trait::async_trait;
use connectors::sql::base::destination::DbDataDestination;
use engine_processing::Normalizer;
use model::{
    core::{structure::TableStructure, utils::truncate_message},
    records::row::Row,
    transform::mapping::{FieldMap, FilterMap},
};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Per-table flags for the current run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableFlags {
    /// Never truncated by `prepare`.
    pub protected: bool,
    /// Inserts skip rows that collide with a key.
    pub ignore_errors: bool,
}

/// Batched writer over one relational destination.
///
/// Creates and evolves tables on demand, buffers normalized rows for a single
/// table at a time, and writes them in bulk. A failing bulk insert loses only
/// its own rows; the run carries on.
pub struct DatabaseStorage {
    destination: Box<dyn DbDataDestination>,
    config: WriterConfig,
    prefix: String,
    flags: HashMap<String, TableFlags>,
    /// Rows accepted per physical table over the whole run.
    totals: HashMap<String, usize>,
    batch: Option<BatchState>,
    /// Rows lost by a flush that no caller has been told about yet.
    unreported_failures: usize,
    /// Integrity checks are relaxed between `begin` and `end`.
    in_run: bool,
}

impl DatabaseStorage {
    pub fn new(destination: Box<dyn DbDataDestination>, config: WriterConfig) -> Self {
        Self {
            destination,
            config,
            prefix: String::new(),
            flags: HashMap::new(),
            totals: HashMap::new(),
            batch: None,
            unreported_failures: 0,
            in_run: false,
        }
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    /// The physical name of `table`, prefix included.
    pub fn table_name(&self, table: &str) -> String {
        format!("{}{}", self.prefix, table)
    }

    pub fn flags(&self, table: &str) -> TableFlags {
        self.flags
            .get(&self.table_name(table))
            .copied()
            .unwrap_or_default()
    }

    /// Exempts `table` from truncation for the rest of the run.
    pub fn protect_table(&mut self, table: &str) {
        let name = self.table_name(table);
        self.flags.entry(name).or_default().protected = true;
    }

    /// Makes inserts into `table` skip conflicting rows instead of failing.
    pub fn ignore_errors(&mut self, table: &str) {
        let name = self.table_name(table);
        if let Some(batch) = self.batch.as_mut().filter(|b| b.table() == name) {
            batch.set_ignore_conflicts(true);
        }
        self.flags.entry(name).or_default().ignore_errors = true;
    }

    /// Distinct values already stored in one column of `table`.
    pub async fn column_values(&self, table: &str, column: &str) -> Result<Vec<String>, StorageError> {
        let name = self.table_name(table);
        Ok(self.destination.column_values(&name, column).await?)
    }

    /// Number of rows waiting in the buffer.
    pub fn pending(&self) -> usize {
        self.batch.as_ref().map_or(0, BatchState::len)
    }

    /// Points the buffer at `table`, writing out rows meant for any other
    /// table or column list first. Rows lost on the way are held until the
    /// next `store`, `stream` or `flush` reports them.
    async fn bind(&mut self, table: &str, columns: Vec<String>) {
        if self
            .batch
            .as_ref()
            .is_some_and(|batch| batch.accepts(table, &columns))
        {
            return;
        }

        let flushed = self.write_batch().await;
        self.unreported_failures += flushed.failed_rows;
        let ignore = self.flags.get(table).is_some_and(|f| f.ignore_errors);
        self.batch = Some(BatchState::new(table, columns, ignore));
    }

    fn unreported(&mut self) -> StoreInfo {
        StoreInfo {
            failed_rows: std::mem::take(&mut self.unreported_failures),
            ..Default::default()
        }
    }

    async fn append(&mut self, row: Row, info: &mut StoreInfo) -> Result<(), StorageError> {
        let batch = self.batch.as_mut().ok_or(StorageError::NotPrepared)?;
        let bytes = batch.push(row);
        let full = batch.len() >= self.config.batch_size;
        let total = self.totals.entry(batch.table().to_string()).or_default();
        *total += 1;
        let total = *total;

        info.rows += 1;
        info.memory_peak = info.memory_peak.max(bytes);

        if total >= self.config.log_threshold
            && self.config.log_increment > 0
            && total % self.config.log_increment == 0
        {
            info!(table = %batch.table(), rows = total, "Inserting '{}': {} done...", batch.table(), total);
        }

        if full {
            info.absorb(self.write_batch().await);
        }
        Ok(())
    }

    /// One bulk insert per bind-parameter-sized chunk. Failures are logged
    /// and counted, never returned.
    async fn write_batch(&mut self) -> StoreInfo {
        let Some(batch) = self.batch.as_mut() else {
            return StoreInfo::default();
        };
        if batch.is_empty() {
            return StoreInfo::default();
        }

        let rows = batch.take();
        let table = batch.table().to_string();
        let columns = batch.columns().to_vec();
        let ignore_conflicts = batch.ignore_conflicts();

        let chunk_size = (self.destination.max_params() / columns.len().max(1))
            .clamp(1, self.config.batch_size.max(1));

        let mut failed_rows = 0;
        for chunk in rows.chunks(chunk_size) {
            match self
                .destination
                .write_batch(&table, &columns, chunk, ignore_conflicts)
                .await
            {
                Ok(affected) => {
                    debug!(table = %table, rows = chunk.len(), affected, "Batch inserted");
                }
                Err(err) => {
                    failed_rows += chunk.len();
                    warn!(
                        table = %table,
                        rows = chunk.len(),
                        "Batch insert error: {}",
                        truncate_message(&err.to_string(), 500, 300)
                    );
                }
            }
        }

        StoreInfo {
            failed_rows,
            ..Default::default()
        }
    }

    async fn truncate(&self, table: &str) -> Result<(), StorageError> {
        if self.in_run {
            self.destination.truncate(table).await?;
            return Ok(());
        }

        // Foreign keys would block truncation outside a run.
        self.destination.toggle_checks(false).await?;
        let result = self.destination.truncate(table).await;
        self.destination.toggle_checks(true).await?;
        Ok(result?)
    }
}

#[async_trait]
impl Storage for DatabaseStorage {
    async fn prepare(&mut self, table: &str, structure: &TableStructure) -> Result<(), StorageError> {
        let name = self.table_name(table);

        if self.destination.table_exists(&name).await? {
            if !self.flags.get(&name).is_some_and(|f| f.protected) {
                info!(table = %name, "Truncating existing table");
                self.truncate(&name).await?;
            }

            let existing = self.destination.column_names(&name).await?;
            let missing = structure.missing_from(&existing);
            if !missing.is_empty() {
                info!(table = %name, columns = ?missing.column_names(), "Adding missing columns");
                self.destination.add_columns(&name, &missing).await?;
            }
        } else {
            info!(table = %name, "Creating table");
            self.destination.create_table(&name, structure).await?;
        }

        self.flags.entry(name.clone()).or_default().protected = true;
        self.bind(&name, structure.column_names()).await;
        Ok(())
    }

    async fn store(
        &mut self,
        table: &str,
        fields: &FieldMap,
        structure: &TableStructure,
        rows: Vec<Row>,
        filters: &FilterMap,
    ) -> Result<StoreInfo, StorageError> {
        let name = self.table_name(table);
        let columns = structure.column_names();
        let normalizer = Normalizer::new(&columns, fields.clone(), filters.clone());

        self.bind(&name, columns).await;
        let mut info = self.unreported();
        info.first = rows.first().cloned();
        info.last = rows.last().cloned();

        for row in rows {
            self.append(normalizer.normalize(row), &mut info).await?;
        }
        Ok(info)
    }

    async fn stream(
        &mut self,
        row: Row,
        structure: &TableStructure,
        is_final: bool,
    ) -> Result<StoreInfo, StorageError> {
        let table = self
            .batch
            .as_ref()
            .map(|batch| batch.table().to_string())
            .ok_or(StorageError::NotPrepared)?;
        let columns = structure.column_names();

        self.bind(&table, columns.clone()).await;
        let mut info = self.unreported();
        if !row.is_empty() {
            info.first = Some(row.clone());
            info.last = Some(row.clone());
            let normalized = Normalizer::new(&columns, FieldMap::new(), FilterMap::new()).normalize(row);
            self.append(normalized, &mut info).await?;
        }
        if is_final {
            info.absorb(self.write_batch().await);
        }
        Ok(info)
    }

    async fn flush(&mut self) -> Result<StoreInfo, StorageError> {
        let mut info = self.unreported();
        info.absorb(self.write_batch().await);
        Ok(info)
    }

    async fn begin(&mut self) -> Result<(), StorageError> {
        self.destination.toggle_checks(false).await?;
        self.in_run = true;
        Ok(())
    }

    async fn end(&mut self) -> Result<(), StorageError> {
        let mut flushed = self.unreported();
        flushed.absorb(self.write_batch().await);
        if flushed.failed_rows > 0 {
            warn!(rows = flushed.failed_rows, "Final flush lost rows");
        }
        self.destination.toggle_checks(true).await?;
        self.in_run = false;
        Ok(())
    }

    async fn exists(&self, table: &str, columns: &[String]) -> Result<bool, StorageError> {
        let name = self.table_name(table);
        if !self.destination.table_exists(&name).await? {
            return Ok(false);
        }
        if columns.is_empty() {
            return Ok(true);
        }

        let existing = self.destination.column_names(&name).await?;
        Ok(columns
            .iter()
            .all(|c| existing.iter().any(|e| e.eq_ignore_ascii_case(c))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemoryDestination;
    use model::core::value::Value;
    use tracing_test::traced_test;

    fn structure() -> TableStructure {
        TableStructure::from_tags(&[("id", "varchar(100)"), ("name", "varchar(100)")])
    }

    fn row(id: usize) -> Row {
        let mut row = Row::new();
        row.insert("id", Value::from(id.to_string()));
        row.insert("name", Value::from(format!("user {id}")));
        row
    }

    fn storage(dest: &MemoryDestination) -> DatabaseStorage {
        DatabaseStorage::new(Box::new(dest.clone()), WriterConfig::default())
    }

    #[tokio::test]
    async fn test_batch_commits_only_when_full() {
        let dest = MemoryDestination::new();
        let mut storage = storage(&dest);
        storage.prepare("users", &structure()).await.unwrap();

        for id in 0..999 {
            storage
                .store("users", &FieldMap::new(), &structure(), vec![row(id)], &FilterMap::new())
                .await
                .unwrap();
        }
        assert!(dest.inserts().is_empty());
        assert_eq!(storage.pending(), 999);

        storage
            .store("users", &FieldMap::new(), &structure(), vec![row(999)], &FilterMap::new())
            .await
            .unwrap();
        assert_eq!(dest.inserts(), vec![("users".to_string(), 1000)]);
        assert_eq!(storage.pending(), 0);
        assert_eq!(dest.rows("users").len(), 1000);
    }

    #[tokio::test]
    async fn test_second_prepare_never_truncates() {
        let dest = MemoryDestination::new();
        dest.create("users", &["id", "name"]);
        let mut storage = storage(&dest);

        storage.prepare("users", &structure()).await.unwrap();
        storage
            .store("users", &FieldMap::new(), &structure(), vec![row(1)], &FilterMap::new())
            .await
            .unwrap();
        storage.flush().await.unwrap();
        storage.prepare("users", &structure()).await.unwrap();

        assert_eq!(dest.truncates(), vec!["users".to_string()]);
        assert_eq!(dest.rows("users").len(), 1);
        assert!(storage.flags("users").protected);
    }

    #[tokio::test]
    async fn test_prepare_adds_only_missing_columns() {
        let dest = MemoryDestination::new();
        dest.create("users", &["id"]);
        let mut storage = storage(&dest);

        storage.prepare("users", &structure()).await.unwrap();
        assert_eq!(dest.columns("users"), vec!["id".to_string(), "name".to_string()]);
        assert_eq!(dest.altered(), vec![("users".to_string(), vec!["name".to_string()])]);
    }

    #[traced_test]
    #[tokio::test]
    async fn test_failed_flush_is_counted_and_run_continues() {
        let dest = MemoryDestination::new();
        let mut storage = DatabaseStorage::new(
            Box::new(dest.clone()),
            WriterConfig {
                batch_size: 2,
                ..Default::default()
            },
        );
        storage.prepare("users", &structure()).await.unwrap();
        dest.fail_next_inserts(1);

        let info = storage
            .store(
                "users",
                &FieldMap::new(),
                &structure(),
                (0..5).map(row).collect(),
                &FilterMap::new(),
            )
            .await
            .unwrap();
        let flushed = storage.flush().await.unwrap();

        assert_eq!(info.rows, 5);
        assert_eq!(info.failed_rows, 2);
        assert_eq!(flushed.failed_rows, 0);
        assert_eq!(dest.rows("users").len(), 3);
        assert!(logs_contain("Batch insert error"));
        assert!(logs_contain("Duplicate entry"));
    }

    #[tokio::test]
    async fn test_switching_tables_flushes_previous_rows() {
        let dest = MemoryDestination::new();
        let mut storage = storage(&dest);
        let channels = TableStructure::from_tags(&[("id", "varchar(100)")]);

        storage.prepare("users", &structure()).await.unwrap();
        storage
            .store("users", &FieldMap::new(), &structure(), vec![row(1), row(2)], &FilterMap::new())
            .await
            .unwrap();
        storage.prepare("channels", &channels).await.unwrap();

        assert_eq!(dest.rows("users").len(), 2);
        assert_eq!(storage.pending(), 0);
    }

    #[tokio::test]
    async fn test_rows_lost_on_table_switch_are_reported_later() {
        let dest = MemoryDestination::new();
        let mut storage = storage(&dest);
        let channels = TableStructure::from_tags(&[("id", "varchar(100)")]);

        storage.prepare("users", &structure()).await.unwrap();
        let stored = storage
            .store("users", &FieldMap::new(), &structure(), vec![row(1)], &FilterMap::new())
            .await
            .unwrap();
        assert_eq!(stored.failed_rows, 0);

        dest.fail_next_inserts(1);
        storage.prepare("channels", &channels).await.unwrap();
        assert!(dest.rows("users").is_empty());

        let flushed = storage.flush().await.unwrap();
        assert_eq!(flushed.failed_rows, 1);
        assert_eq!(storage.flush().await.unwrap().failed_rows, 0);
    }

    #[traced_test]
    #[tokio::test]
    async fn test_progress_logged_from_threshold_every_increment() {
        let dest = MemoryDestination::new();
        let mut storage = DatabaseStorage::new(
            Box::new(dest.clone()),
            WriterConfig {
                batch_size: 100,
                log_threshold: 3,
                log_increment: 2,
            },
        );
        let channels = TableStructure::from_tags(&[("id", "varchar(100)")]);

        storage.prepare("users", &structure()).await.unwrap();
        storage
            .store("users", &FieldMap::new(), &structure(), (0..3).map(row).collect(), &FilterMap::new())
            .await
            .unwrap();
        storage.prepare("channels", &channels).await.unwrap();
        storage.prepare("users", &structure()).await.unwrap();
        storage
            .store("users", &FieldMap::new(), &structure(), (3..8).map(row).collect(), &FilterMap::new())
            .await
            .unwrap();

        for done in [4, 6, 8] {
            assert!(logs_contain(&format!("Inserting 'users': {done} done...")));
        }
        for quiet in [1, 2, 3, 5, 7] {
            assert!(!logs_contain(&format!("Inserting 'users': {quiet} done...")));
        }
    }

    #[tokio::test]
    async fn test_stream_flushes_on_final_and_requires_prepare() {
        let dest = MemoryDestination::new();
        let mut storage = storage(&dest);

        let err = storage.stream(row(1), &structure(), false).await.unwrap_err();
        assert!(matches!(err, StorageError::NotPrepared));

        storage.prepare("users", &structure()).await.unwrap();
        storage.stream(row(1), &structure(), false).await.unwrap();
        assert!(dest.rows("users").is_empty());
        storage.stream(row(2), &structure(), true).await.unwrap();
        assert_eq!(dest.rows("users").len(), 2);
    }

    #[tokio::test]
    async fn test_store_normalizes_and_reports_raw_first_last() {
        let dest = MemoryDestination::new();
        let mut storage = storage(&dest).with_prefix("gdn_");
        let fields = FieldMap::new().rename("user_id", "id");
        let mut raw = Row::new();
        raw.insert("user_id", Value::from("7"));
        raw.insert("name", Value::from(""));
        raw.insert("extra", Value::Int(1));

        storage.prepare("users", &structure()).await.unwrap();
        let info = storage
            .store("users", &fields, &structure(), vec![raw.clone()], &FilterMap::new())
            .await
            .unwrap();
        storage.end().await.unwrap();

        assert_eq!(info.first, Some(raw.clone()));
        assert_eq!(info.last, Some(raw));
        assert!(info.memory_peak > 0);

        let stored = dest.rows("gdn_users");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].get_value("id"), Value::from("7"));
        assert_eq!(stored[0].get_value("name"), Value::Null);
        assert!(!stored[0].contains("extra"));
    }

    #[tokio::test]
    async fn test_ignore_errors_uses_conflict_tolerant_inserts() {
        let dest = MemoryDestination::new();
        let mut storage = storage(&dest);
        storage.prepare("users", &structure()).await.unwrap();
        storage.ignore_errors("users");

        storage
            .store("users", &FieldMap::new(), &structure(), vec![row(1)], &FilterMap::new())
            .await
            .unwrap();
        storage.flush().await.unwrap();

        assert_eq!(dest.ignored_inserts(), 1);
    }

    #[tokio::test]
    async fn test_begin_end_toggle_checks_and_exists() {
        let dest = MemoryDestination::new();
        let mut storage = storage(&dest);

        storage.begin().await.unwrap();
        storage.prepare("users", &structure()).await.unwrap();
        storage.end().await.unwrap();

        assert_eq!(dest.checks(), vec![false, true]);
        assert!(storage.exists("users", &[]).await.unwrap());
        assert!(storage.exists("users", &["ID".to_string()]).await.unwrap());
        assert!(!storage.exists("users", &["email".to_string()]).await.unwrap());
        assert!(!storage.exists("channels", &[]).await.unwrap());
    }
}
