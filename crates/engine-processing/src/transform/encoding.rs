//! Repairs text that arrived in a legacy single-byte encoding.
//!
//! Only blobs that are not valid UTF-8 but look like Windows-1252 text are
//! transcoded. Valid UTF-8 and binary data pass through unchanged.

use super::pipeline::Transform;
use encoding_rs::WINDOWS_1252;
use model::{core::value::Value, records::row::Row};
use tracing::trace;

/// Bytes that are unassigned in Windows-1252.
const UNDEFINED_1252: [u8; 5] = [0x81, 0x8D, 0x8F, 0x90, 0x9D];

pub struct EncodingRepair;

impl Transform for EncodingRepair {
    fn apply(&self, mut row: Row) -> Row {
        for value in row.values_mut() {
            if let Value::Bytes(bytes) = value {
                if let Some(text) = repair(bytes) {
                    *value = Value::String(text);
                }
            }
        }
        row
    }
}

/// Returns the transcoded text, or `None` when `bytes` should stay as they are.
pub fn repair(bytes: &[u8]) -> Option<String> {
    if std::str::from_utf8(bytes).is_ok() || !looks_like_1252(bytes) {
        return None;
    }
    let (text, had_errors) = WINDOWS_1252.decode_without_bom_handling(bytes);
    if had_errors {
        return None;
    }
    trace!(bytes = bytes.len(), "Transcoded windows-1252 value");
    Some(text.into_owned())
}

fn looks_like_1252(bytes: &[u8]) -> bool {
    let mut high = false;
    for &b in bytes {
        match b {
            b'\t' | b'\n' | b'\r' => {}
            0x00..=0x1F | 0x7F => return false,
            b if UNDEFINED_1252.contains(&b) => return false,
            0x80..=0xFF => high = true,
            _ => {}
        }
    }
    high
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latin1_text_is_transcoded() {
        assert_eq!(repair(b"caf\xe9"), Some("café".to_string()));
        assert_eq!(repair(b"\x93quoted\x94"), Some("\u{201c}quoted\u{201d}".to_string()));
    }

    #[test]
    fn test_binary_stays_binary() {
        assert_eq!(repair(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]), None);
        assert_eq!(repair(&[0x00, 0xFF]), None);
        assert_eq!(repair("déjà".as_bytes()), None);
    }

    #[test]
    fn test_row_values_are_repaired_in_place() {
        let mut row = Row::new();
        row.insert("name", Value::Bytes(b"Jos\xe9".to_vec()));
        row.insert("utf8", Value::Bytes(b"ok".to_vec()));
        row.insert("blob", Value::Bytes(vec![0x00, 0x01, 0xFE]));
        row.insert("n", Value::Int(3));

        let row = EncodingRepair.apply(row);
        assert_eq!(row.get_value("name"), Value::from("José"));
        assert_eq!(row.get_value("utf8"), Value::Bytes(b"ok".to_vec()));
        assert_eq!(row.get_value("blob"), Value::Bytes(vec![0x00, 0x01, 0xFE]));
        assert_eq!(row.get_value("n"), Value::Int(3));
    }
}
