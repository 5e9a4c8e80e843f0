use crate::{
    error::PullError,
    report::StorageReport,
    storage::{Storage, https::HttpsStorage},
};
use connectors::http::transport::{HeaderMap, HttpTransport};
use engine_processing::split_rich_map;
use model::{
    core::structure::TableStructure, pagination::cursor::PullCursor, records::row::Row,
    transform::mapping::RichMap,
};
use std::time::{Duration, Instant};
use tracing::warn;

/// One page to pull and persist.
#[derive(Debug, Clone)]
pub struct PageRequest<'a> {
    pub endpoint: &'a str,
    pub structure: &'a TableStructure,
    pub table: &'a str,
    pub query: Vec<(String, String)>,
    /// Key holding the record list in the response body; the whole body
    /// when `None`.
    pub response_key: Option<&'a str>,
    pub fields: RichMap,
}

impl<'a> PageRequest<'a> {
    pub fn new(endpoint: &'a str, table: &'a str, structure: &'a TableStructure) -> Self {
        Self {
            endpoint,
            structure,
            table,
            query: Vec::new(),
            response_key: None,
            fields: RichMap::new(),
        }
    }

    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }

    pub fn response_key(mut self, key: &'a str) -> Self {
        self.response_key = Some(key);
        self
    }

    pub fn fields(mut self, fields: RichMap) -> Self {
        self.fields = fields;
        self
    }
}

/// What one page produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PullInfo {
    pub request_duration: Duration,
    pub total_duration: Duration,
    /// Records received; zero means the resource is exhausted.
    pub rows: usize,
    /// Records that were not objects plus rows lost to failed inserts.
    pub failed_rows: usize,
    pub memory_peak: usize,
    /// First and last record exactly as the origin sent them.
    pub first: Option<serde_json::Value>,
    pub last: Option<serde_json::Value>,
    pub headers: HeaderMap,
}

impl PullInfo {
    /// Resume point read from the last record's `id_field`.
    pub fn cursor(&self, id_field: &str) -> PullCursor {
        PullCursor::from_last(self.last.as_ref(), id_field, self.rows)
    }
}

/// Pulls one page from `client` and persists it through `writer`.
///
/// Pagination is left to the caller: feed `PullInfo::cursor` into the next
/// request until it reports exhaustion.
pub async fn pull<T, S>(
    client: &mut HttpsStorage<T>,
    writer: &mut S,
    request: PageRequest<'_>,
) -> Result<PullInfo, PullError>
where
    T: HttpTransport,
    S: Storage + ?Sized,
{
    let started = Instant::now();
    writer.prepare(request.table, request.structure).await?;

    let response = client.get(request.endpoint, &request.query, &[]).await?;
    let request_duration = started.elapsed();

    let records = unwrap_records(response.body, request.endpoint, request.response_key);
    let first = records.first().cloned();
    let last = records.last().cloned();
    let rows: Vec<Row> = records.iter().filter_map(Row::from_json).collect();

    let rejected = records.len() - rows.len();
    if rejected > 0 {
        warn!(
            endpoint = request.endpoint,
            table = request.table,
            rejected,
            "Skipped {rejected} of {} records that are not JSON objects",
            records.len()
        );
    }

    let (fields, filters) = split_rich_map(&request.fields);
    let mut stored = writer
        .store(request.table, &fields, request.structure, rows, &filters)
        .await?;
    stored.absorb(writer.flush().await?);

    let info = PullInfo {
        request_duration,
        total_duration: started.elapsed(),
        rows: records.len(),
        failed_rows: stored.failed_rows + rejected,
        memory_peak: stored.memory_peak,
        first,
        last,
        headers: response.headers,
    };
    StorageReport::new("pull", request.table, info.total_duration, info.rows, info.memory_peak).log();
    Ok(info)
}

fn unwrap_records(body: serde_json::Value, endpoint: &str, key: Option<&str>) -> Vec<serde_json::Value> {
    let body = match key {
        Some(key) => match body {
            serde_json::Value::Object(mut object) if object.contains_key(key) => {
                object.remove(key).unwrap_or_default()
            }
            _ => {
                warn!(endpoint, key, "Response has no '{key}' field; page treated as empty");
                serde_json::Value::Null
            }
        },
        None => body,
    };
    match body {
        serde_json::Value::Array(records) => records,
        serde_json::Value::Null => Vec::new(),
        record => vec![record],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{PullConfig, WriterConfig},
        storage::database::DatabaseStorage,
        test_support::{MemoryDestination, ScriptedTransport},
    };
    use model::{core::value::Value, transform::filter::FilterKind};
    use serde_json::json;
    use tokio_util::sync::CancellationToken;
    use tracing_test::traced_test;

    fn messages() -> TableStructure {
        TableStructure::from_tags(&[("id", "varchar(100)"), ("content", "text"), ("pinned", "tinyint")])
    }

    fn page(first_id: usize, count: usize) -> serde_json::Value {
        serde_json::Value::Array(
            (0..count)
                .map(|i| json!({"id": (first_id - i).to_string(), "content": "hi", "pinned": false}))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_cursor_pagination_until_exhausted() {
        let transport = ScriptedTransport::new()
            .respond(200, page(599, 100))
            .respond(200, json!([]));
        let mut client = HttpsStorage::new(transport.clone(), PullConfig::default(), CancellationToken::new());
        let dest = MemoryDestination::new();
        let mut writer = DatabaseStorage::new(Box::new(dest.clone()), WriterConfig::default());
        let structure = messages();

        let info = pull(
            &mut client,
            &mut writer,
            PageRequest::new("channels/1/messages", "messages", &structure).query("limit", "100"),
        )
        .await
        .unwrap();
        let cursor = info.cursor("id");
        assert_eq!(info.rows, 100);
        assert_eq!(cursor.last_id.as_deref(), Some("500"));

        let last_id = cursor.last_id.unwrap_or_default();
        let info = pull(
            &mut client,
            &mut writer,
            PageRequest::new("channels/1/messages", "messages", &structure)
                .query("before", &last_id)
                .query("limit", "100"),
        )
        .await
        .unwrap();

        assert_eq!(info.rows, 0);
        assert!(info.cursor("id").is_exhausted());
        assert_eq!(dest.rows("messages").len(), 100);
        assert_eq!(dest.truncates().len(), 0);

        let second = &transport.requests()[1];
        assert!(second.query.contains(&("before".to_string(), "500".to_string())));
    }

    #[tokio::test]
    async fn test_response_key_and_field_map() {
        let transport = ScriptedTransport::new().respond(
            200,
            json!({"threads": [{"thread_id": "9", "ts": 1_700_000_000}], "has_more": false}),
        );
        let mut client = HttpsStorage::new(transport, PullConfig::default(), CancellationToken::new());
        let dest = MemoryDestination::new();
        let mut writer = DatabaseStorage::new(Box::new(dest.clone()), WriterConfig::default());
        let structure = TableStructure::from_tags(&[("id", "varchar(100)"), ("created", "varchar(20)")]);

        let info = pull(
            &mut client,
            &mut writer,
            PageRequest::new("guilds/1/threads/active", "threads", &structure)
                .response_key("threads")
                .fields(
                    RichMap::new()
                        .rename("thread_id", "id")
                        .filtered("ts", "created", FilterKind::TimestampToDate),
                ),
        )
        .await
        .unwrap();

        assert_eq!(info.rows, 1);
        assert_eq!(info.first, Some(json!({"thread_id": "9", "ts": 1_700_000_000})));
        let stored = dest.rows("threads");
        assert_eq!(stored[0].get_value("id"), Value::from("9"));
        assert_eq!(stored[0].get_value("created"), Value::from("2023-11-14 22:13:20"));
    }

    #[tokio::test]
    async fn test_non_object_records_count_as_failed() {
        let transport = ScriptedTransport::new().respond(200, json!(["a", "b", {"id": "1"}]));
        let mut client = HttpsStorage::new(transport, PullConfig::default(), CancellationToken::new());
        let dest = MemoryDestination::new();
        let mut writer = DatabaseStorage::new(Box::new(dest.clone()), WriterConfig::default());
        let structure = TableStructure::from_tags(&[("id", "varchar(100)")]);

        let info = pull(&mut client, &mut writer, PageRequest::new("users", "users", &structure))
            .await
            .unwrap();

        assert_eq!(info.rows, 3);
        assert_eq!(info.failed_rows, 2);
        assert_eq!(dest.rows("users").len(), 1);
    }

    #[traced_test]
    #[test]
    fn test_unwrap_records_shapes() {
        assert_eq!(unwrap_records(json!([1, 2]), "users", None).len(), 2);
        assert_eq!(unwrap_records(json!({"id": 1}), "users", None), vec![json!({"id": 1})]);
        assert!(unwrap_records(json!(null), "users", None).is_empty());
        assert!(unwrap_records(json!({"threads": null}), "threads", Some("threads")).is_empty());
        assert!(!logs_contain("has no 'threads' field"));

        assert!(unwrap_records(json!({"other": []}), "threads", Some("threads")).is_empty());
        assert!(logs_contain("Response has no 'threads' field"));
    }
}
