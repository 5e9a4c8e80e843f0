use lazy_static::lazy_static;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{collections::HashMap, fmt};

/// Length used when a `varchar` tag omits or mangles its size.
pub const DEFAULT_VARCHAR_LENGTH: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    Tiny,
    Small,
    Medium,
    Regular,
    Big,
}

lazy_static! {
    static ref INT_WIDTHS: HashMap<&'static str, IntWidth> = HashMap::from([
        ("tinyint", IntWidth::Tiny),
        ("tinyinteger", IntWidth::Tiny),
        ("smallint", IntWidth::Small),
        ("smallinteger", IntWidth::Small),
        ("mediumint", IntWidth::Medium),
        ("mediuminteger", IntWidth::Medium),
        ("int", IntWidth::Regular),
        ("integer", IntWidth::Regular),
        ("bigint", IntWidth::Big),
        ("biginteger", IntWidth::Big),
    ]);
}

impl IntWidth {
    pub fn tag(&self) -> &'static str {
        match self {
            IntWidth::Tiny => "tinyint",
            IntWidth::Small => "smallint",
            IntWidth::Medium => "mediumint",
            IntWidth::Regular => "int",
            IntWidth::Big => "bigint",
        }
    }
}

/// Column type tag from the closed structure vocabulary.
///
/// Tags are written the way a MySQL column type reads (`varchar(100)`,
/// `tinyint`, `varbinary(16)`); an array of strings declares an enumerated
/// column. Anything not recognised is kept verbatim and handed to the
/// dialect as a literal type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    VarChar(usize),
    Binary,
    Text,
    Integer(IntWidth),
    Enum(Vec<String>),
    Other(String),
}

impl ColumnType {
    pub fn parse(tag: &str) -> ColumnType {
        let trimmed = tag.trim();
        let lower = trimmed.to_ascii_lowercase();

        if lower.starts_with("varchar") {
            return ColumnType::VarChar(parse_length(&lower).unwrap_or(DEFAULT_VARCHAR_LENGTH));
        }
        if lower.starts_with("varbinary") || lower == "binary" || lower == "blob" {
            return ColumnType::Binary;
        }
        if lower == "text" {
            return ColumnType::Text;
        }

        // Integer family: display width and signedness are dropped (`tinyint(1) unsigned`).
        let base = lower
            .split(|c: char| c == '(' || c.is_whitespace())
            .next()
            .unwrap_or_default();
        if let Some(width) = INT_WIDTHS.get(base) {
            return ColumnType::Integer(*width);
        }

        ColumnType::Other(trimmed.to_string())
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, ColumnType::Integer(_))
    }

    /// The tag this type was (or could have been) declared with.
    pub fn tag(&self) -> String {
        match self {
            ColumnType::VarChar(len) => format!("varchar({len})"),
            ColumnType::Binary => "varbinary".to_string(),
            ColumnType::Text => "text".to_string(),
            ColumnType::Integer(width) => width.tag().to_string(),
            ColumnType::Enum(options) => format!("enum({})", options.join(",")),
            ColumnType::Other(name) => name.clone(),
        }
    }
}

fn parse_length(tag: &str) -> Option<usize> {
    let open = tag.find('(')?;
    let close = tag[open..].find(')')? + open;
    tag[open + 1..close]
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|len| *len > 0)
}

impl From<&str> for ColumnType {
    fn from(tag: &str) -> Self {
        ColumnType::parse(tag)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TagRepr {
    Tag(String),
    Options(Vec<String>),
}

impl<'de> Deserialize<'de> for ColumnType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match TagRepr::deserialize(deserializer)? {
            TagRepr::Tag(tag) => Ok(ColumnType::parse(&tag)),
            TagRepr::Options(options) => Ok(ColumnType::Enum(options)),
        }
    }
}

impl Serialize for ColumnType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            ColumnType::Enum(options) => options.serialize(serializer),
            other => serializer.serialize_str(&other.tag()),
        }
    }
}
