use crate::core::column_type::ColumnType;
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{MapAccess, Visitor},
    ser::SerializeMap,
};
use std::{collections::BTreeMap, fmt};

/// Reserved entry name carrying the key-set block in the wire format.
pub const KEYS_ENTRY: &str = "keys";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    Primary,
    Unique,
    Index,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDef {
    pub name: String,
    pub kind: KeyKind,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
}

/// Ordered column set of a destination table plus its optional keys.
///
/// Wire format is a map of column name to type tag; the reserved `keys`
/// entry maps key names to `{ type, columns }`:
///
/// ```json
/// { "id": "varchar(100)", "bot": "tinyint",
///   "keys": { "pk": { "type": "primary", "columns": ["id"] } } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableStructure {
    columns: Vec<ColumnDef>,
    keys: Vec<KeyDef>,
}

impl TableStructure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a structure from `(column, tag)` pairs, in order.
    pub fn from_tags(tags: &[(&str, &str)]) -> Self {
        tags.iter()
            .fold(Self::new(), |s, (name, tag)| s.column(name, ColumnType::parse(tag)))
    }

    /// Adds (or retypes, while still unsaved) a column.
    pub fn column(mut self, name: &str, column_type: ColumnType) -> Self {
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.column_type = column_type,
            None => self.columns.push(ColumnDef {
                name: name.to_string(),
                column_type,
            }),
        }
        self
    }

    pub fn key(mut self, name: &str, kind: KeyKind, columns: &[&str]) -> Self {
        self.keys.push(KeyDef {
            name: name.to_string(),
            kind,
            columns: columns.iter().map(|c| c.to_string()).collect(),
        });
        self
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn keys(&self) -> &[KeyDef] {
        &self.keys
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&ColumnType> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.column_type)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Columns not yet present in `existing`, without any keys.
    ///
    /// Structure evolution is additive-only: this is the full set of changes
    /// ever applied to a table that already exists.
    pub fn missing_from(&self, existing: &[String]) -> TableStructure {
        TableStructure {
            columns: self
                .columns
                .iter()
                .filter(|c| !existing.iter().any(|e| e.eq_ignore_ascii_case(&c.name)))
                .cloned()
                .collect(),
            keys: Vec::new(),
        }
    }
}

#[derive(Deserialize, Serialize)]
struct KeyRepr {
    #[serde(rename = "type")]
    kind: KeyKind,
    columns: Vec<String>,
}

struct StructureVisitor;

impl<'de> Visitor<'de> for StructureVisitor {
    type Value = TableStructure;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of column names to type tags")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut structure = TableStructure::new();
        while let Some(name) = map.next_key::<String>()? {
            if name == KEYS_ENTRY {
                // BTreeMap keeps key creation order deterministic.
                let keys: BTreeMap<String, KeyRepr> = map.next_value()?;
                for (key_name, repr) in keys {
                    structure.keys.push(KeyDef {
                        name: key_name,
                        kind: repr.kind,
                        columns: repr.columns,
                    });
                }
            } else {
                let column_type: ColumnType = map.next_value()?;
                structure = structure.column(&name, column_type);
            }
        }
        Ok(structure)
    }
}

impl<'de> Deserialize<'de> for TableStructure {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(StructureVisitor)
    }
}

impl Serialize for TableStructure {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let extra = usize::from(!self.keys.is_empty());
        let mut map = serializer.serialize_map(Some(self.columns.len() + extra))?;
        for column in &self.columns {
            map.serialize_entry(&column.name, &column.column_type)?;
        }
        if !self.keys.is_empty() {
            let keys: BTreeMap<&str, KeyRepr> = self
                .keys
                .iter()
                .map(|k| {
                    (
                        k.name.as_str(),
                        KeyRepr {
                            kind: k.kind,
                            columns: k.columns.clone(),
                        },
                    )
                })
                .collect();
            map.serialize_entry(KEYS_ENTRY, &keys)?;
        }
        map.end()
    }
}
