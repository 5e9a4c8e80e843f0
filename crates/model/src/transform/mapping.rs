use crate::transform::filter::FilterKind;
use serde::{
    Deserialize, Deserializer,
    de::{MapAccess, Visitor},
};
use std::{collections::BTreeMap, fmt, marker::PhantomData};

/// Where one source key lands in the destination row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldTarget {
    /// Plain rename.
    Column(String),
    /// The source value is an object; each `(inner, dest)` pair lifts
    /// `source[inner]` to a top-level `dest`. Only one level deep.
    Nested(Vec<(String, String)>),
}

/// Source key to destination key, applied in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    entries: Vec<(String, FieldTarget)>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rename(mut self, source: &str, dest: &str) -> Self {
        self.entries
            .push((source.to_string(), FieldTarget::Column(dest.to_string())));
        self
    }

    pub fn flatten(mut self, source: &str, fields: &[(&str, &str)]) -> Self {
        let pairs = fields
            .iter()
            .map(|(inner, dest)| (inner.to_string(), dest.to_string()))
            .collect();
        self.entries
            .push((source.to_string(), FieldTarget::Nested(pairs)));
        self
    }

    pub fn push(&mut self, source: String, target: FieldTarget) {
        self.entries.push((source, target));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldTarget)> {
        self.entries.iter().map(|(s, t)| (s, t))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Source column to named transform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterMap {
    entries: Vec<(String, FilterKind)>,
}

impl FilterMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, filter: FilterKind) -> Self {
        self.push(column.to_string(), filter);
        self
    }

    /// Adds a filter; a later entry for the same column replaces the earlier one.
    pub fn push(&mut self, column: String, filter: FilterKind) {
        match self.entries.iter_mut().find(|(c, _)| *c == column) {
            Some(entry) => entry.1 = filter,
            None => self.entries.push((column, filter)),
        }
    }

    pub fn get(&self, column: &str) -> Option<FilterKind> {
        self.entries
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, f)| *f)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FilterKind)> {
        self.entries.iter().map(|(c, f)| (c, f))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Combined per-column declaration: a rename that may also carry a filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RichTarget {
    Column(String),
    Filtered { column: String, filter: FilterKind },
    Nested(Vec<(String, String)>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RichMap {
    entries: Vec<(String, RichTarget)>,
}

impl RichMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rename(mut self, source: &str, dest: &str) -> Self {
        self.entries
            .push((source.to_string(), RichTarget::Column(dest.to_string())));
        self
    }

    pub fn filtered(mut self, source: &str, dest: &str, filter: FilterKind) -> Self {
        self.entries.push((
            source.to_string(),
            RichTarget::Filtered {
                column: dest.to_string(),
                filter,
            },
        ));
        self
    }

    pub fn flatten(mut self, source: &str, fields: &[(&str, &str)]) -> Self {
        let pairs = fields
            .iter()
            .map(|(inner, dest)| (inner.to_string(), dest.to_string()))
            .collect();
        self.entries
            .push((source.to_string(), RichTarget::Nested(pairs)));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RichTarget)> {
        self.entries.iter().map(|(s, t)| (s, t))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Map entries in document order.
struct OrderedEntries<V>(Vec<(String, V)>);

struct OrderedEntriesVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedEntriesVisitor<V> {
    type Value = OrderedEntries<V>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map keyed by source column")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((key, value)) = map.next_entry::<String, V>()? {
            entries.push((key, value));
        }
        Ok(OrderedEntries(entries))
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedEntries<V> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(OrderedEntriesVisitor(PhantomData))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TargetRepr {
    Column(String),
    Nested(BTreeMap<String, String>),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct FilteredRepr {
    column: String,
    filter: Option<FilterKind>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RichRepr {
    Column(String),
    Filtered(FilteredRepr),
    Nested(BTreeMap<String, String>),
}

impl<'de> Deserialize<'de> for FieldMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let OrderedEntries(entries) = OrderedEntries::<TargetRepr>::deserialize(deserializer)?;
        Ok(FieldMap {
            entries: entries
                .into_iter()
                .map(|(source, repr)| {
                    let target = match repr {
                        TargetRepr::Column(dest) => FieldTarget::Column(dest),
                        TargetRepr::Nested(pairs) => FieldTarget::Nested(pairs.into_iter().collect()),
                    };
                    (source, target)
                })
                .collect(),
        })
    }
}

impl<'de> Deserialize<'de> for FilterMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let OrderedEntries(entries) = OrderedEntries::<FilterKind>::deserialize(deserializer)?;
        let mut map = FilterMap::new();
        for (column, filter) in entries {
            map.push(column, filter);
        }
        Ok(map)
    }
}

impl<'de> Deserialize<'de> for RichMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let OrderedEntries(entries) = OrderedEntries::<RichRepr>::deserialize(deserializer)?;
        Ok(RichMap {
            entries: entries
                .into_iter()
                .map(|(source, repr)| {
                    let target = match repr {
                        RichRepr::Column(dest) => RichTarget::Column(dest),
                        RichRepr::Filtered(FilteredRepr {
                            column,
                            filter: Some(filter),
                        }) => RichTarget::Filtered { column, filter },
                        RichRepr::Filtered(FilteredRepr { column, filter: None }) => {
                            RichTarget::Column(column)
                        }
                        RichRepr::Nested(pairs) => RichTarget::Nested(pairs.into_iter().collect()),
                    };
                    (source, target)
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_map_keeps_declaration_order() {
        let json = r#"{ "z": "Zed", "author": { "id": "AuthorID", "username": "AuthorName" }, "a": "Ay" }"#;
        let map: FieldMap = serde_json::from_str(json).unwrap();
        let sources: Vec<&String> = map.iter().map(|(s, _)| s).collect();
        assert_eq!(sources, vec!["z", "author", "a"]);
        assert_eq!(
            map.iter().nth(1).unwrap().1,
            &FieldTarget::Nested(vec![
                ("id".to_string(), "AuthorID".to_string()),
                ("username".to_string(), "AuthorName".to_string()),
            ])
        );
    }

    #[test]
    fn test_rich_map_parses_all_shapes() {
        let json = r#"{
            "post_date": { "column": "DateInserted", "filter": "timestamp_to_date" },
            "title": "Name",
            "body": { "column": "Body" }
        }"#;
        let map: RichMap = serde_json::from_str(json).unwrap();
        let targets: Vec<&RichTarget> = map.iter().map(|(_, t)| t).collect();
        assert_eq!(
            targets,
            vec![
                &RichTarget::Filtered {
                    column: "DateInserted".to_string(),
                    filter: FilterKind::TimestampToDate
                },
                &RichTarget::Column("Name".to_string()),
                &RichTarget::Column("Body".to_string()),
            ]
        );
    }

    #[test]
    fn test_filter_map_last_entry_wins() {
        let map = FilterMap::new()
            .with("ip", FilterKind::EmptyToZero)
            .with("ip", FilterKind::LongToIp);
        assert_eq!(map.get("ip"), Some(FilterKind::LongToIp));
        assert_eq!(map.iter().count(), 1);
    }
}
