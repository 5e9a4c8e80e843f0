use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Named column transforms applied before renaming.
///
/// The set is closed: adapters pick transforms by name, they never supply
/// code of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// Unix epoch seconds to `YYYY-MM-DD HH:MM:SS` (UTC).
    TimestampToDate,
    /// RFC 3339 date-time to Unix epoch seconds.
    DateToTimestamp,
    /// Packed 32-bit integer to dotted IPv4 text.
    LongToIp,
    /// Null or empty values become `0`.
    EmptyToZero,
    /// Boolean negation, rendered as `0`/`1`.
    Not,
    /// File name to MIME type, judged by extension.
    MimeFromExtension,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown filter: {0}")]
pub struct UnknownFilter(pub String);

impl FilterKind {
    pub const ALL: [FilterKind; 6] = [
        FilterKind::TimestampToDate,
        FilterKind::DateToTimestamp,
        FilterKind::LongToIp,
        FilterKind::EmptyToZero,
        FilterKind::Not,
        FilterKind::MimeFromExtension,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FilterKind::TimestampToDate => "timestamp_to_date",
            FilterKind::DateToTimestamp => "date_to_timestamp",
            FilterKind::LongToIp => "long_to_ip",
            FilterKind::EmptyToZero => "empty_to_zero",
            FilterKind::Not => "not",
            FilterKind::MimeFromExtension => "mime_from_extension",
        }
    }
}

impl FromStr for FilterKind {
    type Err = UnknownFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        FilterKind::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| UnknownFilter(s.to_string()))
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_matches_names() {
        for kind in FilterKind::ALL {
            assert_eq!(kind.name().parse::<FilterKind>(), Ok(kind));
        }
        assert_eq!(
            "eval".parse::<FilterKind>(),
            Err(UnknownFilter("eval".to_string()))
        );
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let kind: FilterKind = serde_json::from_str(r#""long_to_ip""#).unwrap();
        assert_eq!(kind, FilterKind::LongToIp);
    }
}
