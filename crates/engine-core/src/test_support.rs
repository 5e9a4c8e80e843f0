//! In-memory stand-ins for a database destination and an HTTP origin.

use async_trait::async_trait;
use connectors::{
    http::{
        error::TransportError,
        transport::{HeaderMap, HttpRequest, HttpResponse, HttpTransport},
    },
    sql::base::{destination::DbDataDestination, error::DbError},
};
use model::{core::structure::TableStructure, records::row::Row};
use std::{
    collections::{BTreeMap, VecDeque},
    sync::{Arc, Mutex},
};

#[derive(Default)]
struct Tables {
    columns: BTreeMap<String, Vec<String>>,
    rows: BTreeMap<String, Vec<Row>>,
    inserts: Vec<(String, usize)>,
    ignored_inserts: usize,
    truncates: Vec<String>,
    altered: Vec<(String, Vec<String>)>,
    checks: Vec<bool>,
    fail_next: usize,
}

#[derive(Clone, Default)]
pub struct MemoryDestination {
    inner: Arc<Mutex<Tables>>,
}

impl MemoryDestination {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, table: &str, columns: &[&str]) {
        let mut inner = self.inner.lock().unwrap();
        inner.columns.insert(
            table.to_string(),
            columns.iter().map(|c| c.to_string()).collect(),
        );
        inner.rows.insert(table.to_string(), Vec::new());
    }

    pub fn fail_next_inserts(&self, count: usize) {
        self.inner.lock().unwrap().fail_next = count;
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.inner
            .lock()
            .unwrap()
            .rows
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn columns(&self, table: &str) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .columns
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn inserts(&self) -> Vec<(String, usize)> {
        self.inner.lock().unwrap().inserts.clone()
    }

    pub fn ignored_inserts(&self) -> usize {
        self.inner.lock().unwrap().ignored_inserts
    }

    pub fn truncates(&self) -> Vec<String> {
        self.inner.lock().unwrap().truncates.clone()
    }

    pub fn altered(&self) -> Vec<(String, Vec<String>)> {
        self.inner.lock().unwrap().altered.clone()
    }

    pub fn checks(&self) -> Vec<bool> {
        self.inner.lock().unwrap().checks.clone()
    }
}

#[async_trait]
impl DbDataDestination for MemoryDestination {
    async fn table_exists(&self, table: &str) -> Result<bool, DbError> {
        Ok(self.inner.lock().unwrap().columns.contains_key(table))
    }

    async fn column_names(&self, table: &str) -> Result<Vec<String>, DbError> {
        Ok(self.columns(table))
    }

    async fn create_table(&self, table: &str, structure: &TableStructure) -> Result<(), DbError> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .columns
            .insert(table.to_string(), structure.column_names());
        inner.rows.insert(table.to_string(), Vec::new());
        Ok(())
    }

    async fn add_columns(&self, table: &str, missing: &TableStructure) -> Result<(), DbError> {
        let mut inner = self.inner.lock().unwrap();
        let names = missing.column_names();
        inner
            .columns
            .entry(table.to_string())
            .or_default()
            .extend(names.clone());
        inner.altered.push((table.to_string(), names));
        Ok(())
    }

    async fn truncate(&self, table: &str) -> Result<(), DbError> {
        let mut inner = self.inner.lock().unwrap();
        inner.rows.insert(table.to_string(), Vec::new());
        inner.truncates.push(table.to_string());
        Ok(())
    }

    async fn write_batch(
        &self,
        table: &str,
        _columns: &[String],
        rows: &[Row],
        ignore_conflicts: bool,
    ) -> Result<u64, DbError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_next > 0 {
            inner.fail_next -= 1;
            return Err(DbError::Write(format!(
                "Duplicate entry for key 'PRIMARY' in {table}"
            )));
        }
        if !inner.columns.contains_key(table) {
            return Err(DbError::Write(format!("Table '{table}' doesn't exist")));
        }

        inner
            .rows
            .entry(table.to_string())
            .or_default()
            .extend(rows.iter().cloned());
        inner.inserts.push((table.to_string(), rows.len()));
        if ignore_conflicts {
            inner.ignored_inserts += 1;
        }
        Ok(rows.len() as u64)
    }

    async fn column_values(&self, table: &str, column: &str) -> Result<Vec<String>, DbError> {
        let mut values: Vec<String> = self
            .rows(table)
            .iter()
            .filter_map(|row| row.get(column).and_then(|v| v.as_string()))
            .collect();
        values.dedup();
        Ok(values)
    }

    async fn toggle_checks(&self, enabled: bool) -> Result<(), DbError> {
        self.inner.lock().unwrap().checks.push(enabled);
        Ok(())
    }
}

/// Replays canned responses in order and records every request.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    responses: Arc<Mutex<VecDeque<Result<HttpResponse, TransportError>>>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, status: u16, body: serde_json::Value) -> Self {
        self.respond_with_headers(status, body, &[])
    }

    pub fn respond_with_headers(
        self,
        status: u16,
        body: serde_json::Value,
        headers: &[(&str, &str)],
    ) -> Self {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.entry(name.to_ascii_lowercase())
                .or_default()
                .push(value.to_string());
        }
        let response = HttpResponse {
            status,
            headers: map,
            body: serde_json::to_vec(&body).unwrap(),
        };
        self.responses.lock().unwrap().push_back(Ok(response));
        self
    }

    pub fn fail(self, error: TransportError) -> Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Unreachable("script exhausted".to_string())))
    }
}
