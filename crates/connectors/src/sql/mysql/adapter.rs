use crate::sql::{
    base::{
        adapter::{DatabaseKind, SqlAdapter},
        error::{ConnectorError, DbError},
    },
    mysql::params::MySqlParamStore,
};
use async_trait::async_trait;
use model::core::value::Value;
use mysql_async::{Conn, Opts, prelude::Queryable};
use planner::query::dialect::{self, Dialect};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::trace;

const QUERY_TABLE_EXISTS_SQL: &str = include_str!("sql/table_exists.sql");
const QUERY_COLUMN_NAMES_SQL: &str = include_str!("sql/column_names.sql");

/// One dedicated MySQL connection.
///
/// A pool would scatter `SET foreign_key_checks` across sessions, so the
/// adapter serializes every statement through a single `Conn`.
#[derive(Clone)]
pub struct MySqlAdapter {
    conn: Arc<Mutex<Conn>>,
    dialect: dialect::MySql,
}

#[async_trait]
impl SqlAdapter for MySqlAdapter {
    async fn connect(url: &str) -> Result<Self, ConnectorError> {
        let opts = Opts::from_url(url).map_err(|e| ConnectorError::InvalidUrl(e.to_string()))?;
        let conn = Conn::new(opts).await?;
        Ok(MySqlAdapter {
            conn: Arc::new(Mutex::new(conn)),
            dialect: dialect::MySql,
        })
    }

    async fn exec(&self, query: &str) -> Result<(), DbError> {
        trace!(sql = %query, "MySQL exec");
        let mut conn = self.conn.lock().await;
        conn.query_drop(query).await?;
        Ok(())
    }

    async fn exec_params(&self, query: &str, params: Vec<Value>) -> Result<u64, DbError> {
        trace!(sql = %query, params = params.len(), "MySQL exec with params");
        let bindings = MySqlParamStore::from_values(&params);
        let mut conn = self.conn.lock().await;
        conn.exec_drop(query, bindings.params()).await?;
        Ok(conn.affected_rows())
    }

    async fn table_exists(&self, table: &str) -> Result<bool, DbError> {
        let mut conn = self.conn.lock().await;
        let count: Option<i64> = conn.exec_first(QUERY_TABLE_EXISTS_SQL, (table,)).await?;
        Ok(count.unwrap_or(0) > 0)
    }

    async fn column_names(&self, table: &str) -> Result<Vec<String>, DbError> {
        let mut conn = self.conn.lock().await;
        let columns: Vec<String> = conn.exec(QUERY_COLUMN_NAMES_SQL, (table,)).await?;
        Ok(columns)
    }

    async fn ping(&self) -> Result<(), DbError> {
        let mut conn = self.conn.lock().await;
        conn.ping().await?;
        Ok(())
    }

    async fn fetch_column(&self, query: &str) -> Result<Vec<Option<String>>, DbError> {
        trace!(sql = %query, "MySQL fetch column");
        let mut conn = self.conn.lock().await;
        let values: Vec<Option<String>> = conn.query(query).await?;
        Ok(values)
    }

    fn kind(&self) -> DatabaseKind {
        DatabaseKind::MySql
    }

    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }
}
