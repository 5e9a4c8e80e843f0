//! Converts loosely typed row values to the parameter types Postgres
//! inferred for a prepared statement.
//!
//! API payloads carry ids and flags as strings, and Postgres binds strictly
//! by type, so each value is reshaped for its target column.

use crate::sql::{base::error::DbError, postgres::params::PgParam};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use model::core::value::Value;
use tokio_postgres::types::{Json as PgJson, Type};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) fn coerce(value: Value, ty: &Type) -> Result<PgParam, DbError> {
    if value.is_null() {
        return Ok(PgParam::null());
    }

    let mismatch = || DbError::Bind(format!("'{value}' is not a valid {ty}"));

    let param = match *ty {
        Type::BOOL => PgParam::new(value.as_bool().ok_or_else(mismatch)?),
        Type::INT2 => {
            let v = value.as_i64().and_then(|v| i16::try_from(v).ok());
            PgParam::new(v.ok_or_else(mismatch)?)
        }
        Type::INT4 => {
            let v = value.as_i64().and_then(|v| i32::try_from(v).ok());
            PgParam::new(v.ok_or_else(mismatch)?)
        }
        Type::INT8 => PgParam::new(value.as_i64().ok_or_else(mismatch)?),
        Type::FLOAT4 => PgParam::new(value.as_f64().ok_or_else(mismatch)? as f32),
        Type::FLOAT8 => PgParam::new(value.as_f64().ok_or_else(mismatch)?),
        Type::BYTEA => match &value {
            Value::Bytes(b) => PgParam::new(b.clone()),
            other => PgParam::new(other.as_string().ok_or_else(mismatch)?.into_bytes()),
        },
        Type::JSON | Type::JSONB => PgParam::new(PgJson(value.to_json())),
        Type::TIMESTAMPTZ => PgParam::new(to_datetime(&value).ok_or_else(mismatch)?),
        Type::TIMESTAMP => PgParam::new(to_datetime(&value).ok_or_else(mismatch)?.naive_utc()),
        Type::DATE => PgParam::new(to_date(&value).ok_or_else(mismatch)?),
        _ => PgParam::new(to_text(&value)),
    };
    Ok(param)
}

fn to_text(value: &Value) -> String {
    match value {
        Value::Json(j) => j.to_string(),
        Value::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        other => other.as_string().unwrap_or_default(),
    }
}

fn to_datetime(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Timestamp(ts) => Some(*ts),
        Value::Date(d) => d.and_hms_opt(0, 0, 0).map(|n| n.and_utc()),
        Value::Int(secs) => DateTime::from_timestamp(*secs, 0),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
                    .ok()
                    .map(|n| n.and_utc())
            }),
        _ => None,
    }
}

fn to_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Date(d) => Some(*d),
        Value::String(s) => s
            .get(..10)
            .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()),
        other => to_datetime(other).map(|dt| dt.date_naive()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_strings_bind_to_integers() {
        assert!(coerce(Value::from("42"), &Type::INT4).is_ok());
        assert!(coerce(Value::from("70000"), &Type::INT2).is_err());
        assert!(coerce(Value::from("abc"), &Type::INT8).is_err());
    }

    #[test]
    fn test_null_binds_to_any_type() {
        for ty in [Type::INT4, Type::BYTEA, Type::TEXT, Type::TIMESTAMPTZ] {
            assert!(coerce(Value::Null, &ty).is_ok());
        }
    }

    #[test]
    fn test_datetime_parsing() {
        let parsed = to_datetime(&Value::from("2024-03-01 10:20:30")).unwrap();
        assert_eq!(parsed.timestamp(), 1_709_288_430);
        let parsed = to_datetime(&Value::from("2024-03-01T10:20:30+00:00")).unwrap();
        assert_eq!(parsed.timestamp(), 1_709_288_430);
        assert_eq!(
            to_date(&Value::from("2024-03-01 10:20:30")),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
    }
}
