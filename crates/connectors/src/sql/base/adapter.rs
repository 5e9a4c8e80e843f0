use crate::sql::base::error::{ConnectorError, DbError};
use async_trait::async_trait;
use model::core::value::Value;
use planner::query::dialect::Dialect;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseKind {
    MySql,
    Postgres,
}

/// A live relational session.
///
/// Implementations hold exactly one server session, so session variables set
/// through `exec` stay in effect for every later statement.
#[async_trait]
pub trait SqlAdapter: Send + Sync {
    async fn connect(url: &str) -> Result<Self, ConnectorError>
    where
        Self: Sized;

    // Exec / Params
    async fn exec(&self, query: &str) -> Result<(), DbError>;
    /// Returns the number of affected rows.
    async fn exec_params(&self, query: &str, params: Vec<Value>) -> Result<u64, DbError>;

    // Introspection
    async fn table_exists(&self, table: &str) -> Result<bool, DbError>;
    async fn column_names(&self, table: &str) -> Result<Vec<String>, DbError>;
    async fn ping(&self) -> Result<(), DbError>;

    /// First column of every result row, as text.
    async fn fetch_column(&self, query: &str) -> Result<Vec<Option<String>>, DbError>;

    // Dialect
    fn kind(&self) -> DatabaseKind;
    fn dialect(&self) -> &dyn Dialect;
}
