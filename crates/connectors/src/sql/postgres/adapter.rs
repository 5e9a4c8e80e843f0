use crate::sql::{
    base::{
        adapter::{DatabaseKind, SqlAdapter},
        error::{ConnectorError, DbError},
    },
    postgres::{params::PgParamStore, utils::connect_client},
};
use async_trait::async_trait;
use model::core::value::Value;
use planner::query::dialect::{self, Dialect};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_postgres::{Client, SimpleQueryMessage};
use tracing::trace;

const QUERY_TABLE_EXISTS_SQL: &str = include_str!("sql/table_exists.sql");
const QUERY_COLUMN_NAMES_SQL: &str = include_str!("sql/column_names.sql");

#[derive(Clone)]
pub struct PgAdapter {
    client: Arc<RwLock<Client>>,
    dialect: dialect::Postgres,
}

#[async_trait]
impl SqlAdapter for PgAdapter {
    async fn connect(url: &str) -> Result<Self, ConnectorError> {
        let client = Arc::new(RwLock::new(connect_client(url).await?));
        Ok(PgAdapter {
            client,
            dialect: dialect::Postgres,
        })
    }

    async fn exec(&self, query: &str) -> Result<(), DbError> {
        trace!(sql = %query, "Postgres exec");
        let client = self.client.read().await;
        client.batch_execute(query).await?;
        Ok(())
    }

    async fn exec_params(&self, query: &str, params: Vec<Value>) -> Result<u64, DbError> {
        trace!(sql = %query, params = params.len(), "Postgres exec with params");
        let client = self.client.write().await;
        let statement = client.prepare(query).await?;
        let bindings = PgParamStore::for_types(params, statement.params())?;
        let affected = client.execute(&statement, &bindings.as_refs()).await?;
        Ok(affected)
    }

    async fn table_exists(&self, table: &str) -> Result<bool, DbError> {
        let client = self.client.read().await;
        let row = client.query_one(QUERY_TABLE_EXISTS_SQL, &[&table]).await?;
        Ok(row.get(0))
    }

    async fn column_names(&self, table: &str) -> Result<Vec<String>, DbError> {
        let client = self.client.read().await;
        let rows = client.query(QUERY_COLUMN_NAMES_SQL, &[&table]).await?;
        let columns = rows
            .iter()
            .map(|row| row.try_get::<_, String>(0))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    async fn ping(&self) -> Result<(), DbError> {
        self.exec("SELECT 1").await
    }

    async fn fetch_column(&self, query: &str) -> Result<Vec<Option<String>>, DbError> {
        trace!(sql = %query, "Postgres fetch column");
        let client = self.client.read().await;
        // The simple protocol returns every value as text, whatever the column type.
        let messages = client.simple_query(query).await?;
        let values = messages
            .iter()
            .filter_map(|message| match message {
                SimpleQueryMessage::Row(row) => Some(row.get(0).map(str::to_string)),
                _ => None,
            })
            .collect();
        Ok(values)
    }

    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Postgres
    }

    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }
}
