use super::pipeline::Transform;
use model::{
    core::value::Value,
    records::row::Row,
    transform::mapping::{FieldMap, FieldTarget},
};

/// Renames source keys and lifts fields out of one level of nesting.
pub struct FieldMapper {
    fields: FieldMap,
}

impl FieldMapper {
    pub fn new(fields: FieldMap) -> Self {
        Self { fields }
    }
}

impl Transform for FieldMapper {
    /// Nested sources are lifted first, then plain renames run over the
    /// result. Only one level of nesting is lifted; anything deeper stays in
    /// the extracted value.
    fn apply(&self, mut row: Row) -> Row {
        for (source, target) in self.fields.iter() {
            let FieldTarget::Nested(pairs) = target else {
                continue;
            };
            let Some(Value::Json(serde_json::Value::Object(object))) = row.remove(source) else {
                continue;
            };
            for (inner, dest) in pairs {
                match object.get(inner) {
                    Some(v) if !v.is_null() => {
                        row.insert(dest.clone(), Value::from(v.clone()));
                    }
                    _ => {}
                }
            }
        }

        for (source, target) in self.fields.iter() {
            if let FieldTarget::Column(dest) = target {
                if dest != source {
                    if let Some(value) = row.remove(source) {
                        row.insert(dest.clone(), value);
                    }
                }
            }
        }
        row
    }
}
