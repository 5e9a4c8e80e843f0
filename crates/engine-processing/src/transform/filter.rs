//! Named column transforms, dispatched by `FilterKind`.

use super::pipeline::Transform;
use chrono::{DateTime, NaiveDateTime, Utc};
use lazy_static::lazy_static;
use model::{
    core::value::Value,
    records::row::Row,
    transform::{filter::FilterKind, mapping::FilterMap},
};
use std::{
    collections::HashMap,
    net::{Ipv4Addr, Ipv6Addr},
};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

lazy_static! {
    static ref MIME_TYPES: HashMap<&'static str, &'static str> = HashMap::from([
        ("avi", "video/x-msvideo"),
        ("bmp", "image/bmp"),
        ("css", "text/css"),
        ("csv", "text/csv"),
        ("doc", "application/msword"),
        ("docx", "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        ("gif", "image/gif"),
        ("gz", "application/gzip"),
        ("htm", "text/html"),
        ("html", "text/html"),
        ("ico", "image/vnd.microsoft.icon"),
        ("jpeg", "image/jpeg"),
        ("jpg", "image/jpeg"),
        ("js", "text/javascript"),
        ("json", "application/json"),
        ("m4a", "audio/mp4"),
        ("mov", "video/quicktime"),
        ("mp3", "audio/mpeg"),
        ("mp4", "video/mp4"),
        ("mpeg", "video/mpeg"),
        ("odt", "application/vnd.oasis.opendocument.text"),
        ("ogg", "audio/ogg"),
        ("pdf", "application/pdf"),
        ("png", "image/png"),
        ("ppt", "application/vnd.ms-powerpoint"),
        ("pptx", "application/vnd.openxmlformats-officedocument.presentationml.presentation"),
        ("rar", "application/vnd.rar"),
        ("rtf", "application/rtf"),
        ("svg", "image/svg+xml"),
        ("tar", "application/x-tar"),
        ("tif", "image/tiff"),
        ("tiff", "image/tiff"),
        ("txt", "text/plain"),
        ("wav", "audio/wav"),
        ("webm", "video/webm"),
        ("webp", "image/webp"),
        ("xls", "application/vnd.ms-excel"),
        ("xlsx", "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        ("xml", "application/xml"),
        ("zip", "application/zip"),
        ("7z", "application/x-7z-compressed"),
    ]);
}

/// Applies one named transform to a value.
///
/// `column` and `row` give transforms the surrounding record; the current
/// set only looks at the value itself.
pub fn apply_filter(kind: FilterKind, value: &Value, _column: &str, _row: &Row) -> Value {
    match kind {
        FilterKind::TimestampToDate => timestamp_to_date(value),
        FilterKind::DateToTimestamp => date_to_timestamp(value),
        FilterKind::LongToIp => long_to_ip(value),
        FilterKind::EmptyToZero => empty_to_zero(value),
        FilterKind::Not => negate(value),
        FilterKind::MimeFromExtension => mime_from_extension(value),
    }
}

fn timestamp_to_date(value: &Value) -> Value {
    match value.as_i64() {
        Some(secs) if secs != 0 => DateTime::from_timestamp(secs, 0)
            .map(|dt| Value::String(dt.format(DATETIME_FORMAT).to_string()))
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn date_to_timestamp(value: &Value) -> Value {
    let Some(text) = value.as_string() else {
        return Value::Null;
    };
    DateTime::parse_from_rfc3339(text.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text.trim(), DATETIME_FORMAT)
                .ok()
                .map(|n| n.and_utc())
        })
        .map(|dt| Value::Int(dt.timestamp()))
        .unwrap_or(Value::Null)
}

fn long_to_ip(value: &Value) -> Value {
    match value {
        Value::Bytes(b) if b.len() == 4 => {
            Value::String(Ipv4Addr::new(b[0], b[1], b[2], b[3]).to_string())
        }
        Value::Bytes(b) if b.len() == 16 => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(b);
            Value::String(Ipv6Addr::from(octets).to_string())
        }
        other => match other.as_u64().and_then(|n| u32::try_from(n).ok()) {
            Some(0) | None => Value::Null,
            Some(packed) => Value::String(Ipv4Addr::from(packed).to_string()),
        },
    }
}

fn empty_to_zero(value: &Value) -> Value {
    if value.is_null() || value.is_empty_string() {
        Value::Int(0)
    } else {
        value.clone()
    }
}

fn negate(value: &Value) -> Value {
    let truthy = value.as_bool().unwrap_or(false);
    Value::Int(i64::from(!truthy))
}

fn mime_from_extension(value: &Value) -> Value {
    let Some(name) = value.as_string().filter(|s| !s.is_empty()) else {
        return Value::Null;
    };
    let mime = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .and_then(|ext| MIME_TYPES.get(ext.as_str()).copied())
        .unwrap_or(DEFAULT_MIME_TYPE);
    Value::String(mime.to_string())
}

/// Replaces each filtered column's value, keyed by source column name.
/// Columns absent from the row are left absent.
pub struct ColumnFilter {
    filters: FilterMap,
}

impl ColumnFilter {
    pub fn new(filters: FilterMap) -> Self {
        Self { filters }
    }
}

impl Transform for ColumnFilter {
    fn apply(&self, mut row: Row) -> Row {
        for (column, kind) in self.filters.iter() {
            if let Some(value) = row.get(column) {
                let filtered = apply_filter(*kind, value, column, &row);
                row.insert(column.clone(), filtered);
            }
        }
        row
    }
}
