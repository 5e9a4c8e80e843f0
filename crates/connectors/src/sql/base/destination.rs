use crate::sql::base::{adapter::SqlAdapter, error::DbError, query::generator::QueryGenerator};
use async_trait::async_trait;
use model::{core::structure::TableStructure, records::row::Row};
use tracing::debug;

/// Upper bound on bind parameters in one statement for both drivers.
pub const MAX_BIND_PARAMS: usize = 65_535;

/// The relational capabilities the batched writer needs.
#[async_trait]
pub trait DbDataDestination: Send + Sync {
    async fn table_exists(&self, table: &str) -> Result<bool, DbError>;
    async fn column_names(&self, table: &str) -> Result<Vec<String>, DbError>;

    async fn create_table(&self, table: &str, structure: &TableStructure) -> Result<(), DbError>;
    /// Adds every column of `missing`; existing columns are never touched.
    async fn add_columns(&self, table: &str, missing: &TableStructure) -> Result<(), DbError>;
    async fn truncate(&self, table: &str) -> Result<(), DbError>;

    /// One bulk insert. With `ignore_conflicts`, rows that collide with a
    /// unique or primary key are skipped. Returns the affected row count.
    async fn write_batch(
        &self,
        table: &str,
        columns: &[String],
        rows: &[Row],
        ignore_conflicts: bool,
    ) -> Result<u64, DbError>;

    /// Distinct non-null values of one column, as text.
    async fn column_values(&self, table: &str, column: &str) -> Result<Vec<String>, DbError>;

    /// Switches foreign key and uniqueness enforcement for the session.
    async fn toggle_checks(&self, enabled: bool) -> Result<(), DbError>;

    fn max_params(&self) -> usize {
        MAX_BIND_PARAMS
    }
}

/// `DbDataDestination` over any SQL adapter, rendering through its dialect.
pub struct SqlDestination<A> {
    adapter: A,
}

impl<A: SqlAdapter> SqlDestination<A> {
    pub fn new(adapter: A) -> Self {
        Self { adapter }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    fn generator(&self) -> QueryGenerator<'_> {
        QueryGenerator::new(self.adapter.dialect())
    }
}

#[async_trait]
impl<A: SqlAdapter> DbDataDestination for SqlDestination<A> {
    async fn table_exists(&self, table: &str) -> Result<bool, DbError> {
        self.adapter.table_exists(table).await
    }

    async fn column_names(&self, table: &str) -> Result<Vec<String>, DbError> {
        self.adapter.column_names(table).await
    }

    async fn create_table(&self, table: &str, structure: &TableStructure) -> Result<(), DbError> {
        for statement in self.generator().create_table(table, structure) {
            debug!(%table, sql = %statement, "Creating table");
            self.adapter.exec(&statement).await?;
        }
        Ok(())
    }

    async fn add_columns(&self, table: &str, missing: &TableStructure) -> Result<(), DbError> {
        if let Some(statement) = self.generator().add_columns(table, missing) {
            debug!(%table, sql = %statement, "Adding columns");
            self.adapter.exec(&statement).await?;
        }
        Ok(())
    }

    async fn truncate(&self, table: &str) -> Result<(), DbError> {
        let statement = self.generator().truncate(table);
        self.adapter.exec(&statement).await
    }

    async fn write_batch(
        &self,
        table: &str,
        columns: &[String],
        rows: &[Row],
        ignore_conflicts: bool,
    ) -> Result<u64, DbError> {
        if rows.is_empty() {
            return Ok(0);
        }
        if rows.len() * columns.len() > self.max_params() {
            return Err(DbError::Write(format!(
                "{} rows x {} columns exceeds the bind parameter limit",
                rows.len(),
                columns.len()
            )));
        }

        let (sql, params) = self
            .generator()
            .insert_batch(table, columns, rows, ignore_conflicts);
        self.adapter.exec_params(&sql, params).await
    }

    async fn column_values(&self, table: &str, column: &str) -> Result<Vec<String>, DbError> {
        let statement = self.generator().select_column(table, column);
        let values = self.adapter.fetch_column(&statement).await?;
        Ok(values.into_iter().flatten().collect())
    }

    async fn toggle_checks(&self, enabled: bool) -> Result<(), DbError> {
        for statement in self.generator().integrity_checks(enabled) {
            self.adapter.exec(&statement).await?;
        }
        Ok(())
    }
}
