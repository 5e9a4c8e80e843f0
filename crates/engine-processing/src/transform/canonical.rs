use super::pipeline::Transform;
use model::{core::value::Value, records::row::Row};

/// Serializes nested objects and arrays to JSON text.
///
/// Only one nesting level is ever unpacked by `FieldMapper`; anything deeper
/// reaches the destination through here as encoded text.
pub struct JsonFlatten;

impl Transform for JsonFlatten {
    fn apply(&self, mut row: Row) -> Row {
        for value in row.values_mut() {
            if let Value::Json(json) = value {
                *value = if json.is_object() || json.is_array() {
                    Value::String(json.to_string())
                } else {
                    Value::from(json.take())
                };
            }
        }
        row
    }
}

/// Empty strings become null.
pub struct EmptyToNull;

impl Transform for EmptyToNull {
    fn apply(&self, mut row: Row) -> Row {
        for value in row.values_mut() {
            if value.is_empty_string() {
                *value = Value::Null;
            }
        }
        row
    }
}
