use super::{
    canonical::{EmptyToNull, JsonFlatten},
    encoding::EncodingRepair,
    filter::ColumnFilter,
    mapping::FieldMapper,
    pipeline::{TransformPipeline, TransformPipelineExt},
    projection::{FillMissing, Projection},
};
use model::{
    records::row::Row,
    transform::mapping::{FieldMap, FieldTarget, FilterMap, RichMap, RichTarget},
};

/// Reshapes source records into the flat column set of one destination
/// table.
///
/// Stages run in a fixed order: filter, rename/flatten, projection, fill,
/// JSON flatten, encoding repair, then empty-string to null. The result
/// always holds exactly the destination columns.
#[derive(Clone)]
pub struct Normalizer {
    pipeline: TransformPipeline,
}

impl Normalizer {
    pub fn new(columns: &[String], fields: FieldMap, filters: FilterMap) -> Self {
        let pipeline = TransformPipeline::new()
            .add_if(!filters.is_empty(), || ColumnFilter::new(filters))
            .add_if(!fields.is_empty(), || FieldMapper::new(fields))
            .add_transform(Projection::new(columns))
            .add_transform(FillMissing::new(columns))
            .add_transform(JsonFlatten)
            .add_transform(EncodingRepair)
            .add_transform(EmptyToNull);
        Self { pipeline }
    }

    pub fn normalize(&self, row: Row) -> Row {
        self.pipeline.apply(row)
    }
}

/// One-shot form of [`Normalizer::normalize`].
pub fn normalize(row: Row, columns: &[String], fields: &FieldMap, filters: &FilterMap) -> Row {
    Normalizer::new(columns, fields.clone(), filters.clone()).normalize(row)
}

/// Splits a combined rename+filter declaration into the two maps the
/// normalizer consumes. Filters stay keyed by the source column.
pub fn split_rich_map(rich: &RichMap) -> (FieldMap, FilterMap) {
    let mut fields = FieldMap::new();
    let mut filters = FilterMap::new();

    for (source, target) in rich.iter() {
        match target {
            RichTarget::Column(dest) => {
                fields.push(source.clone(), FieldTarget::Column(dest.clone()));
            }
            RichTarget::Filtered { column, filter } => {
                fields.push(source.clone(), FieldTarget::Column(column.clone()));
                filters.push(source.clone(), *filter);
            }
            RichTarget::Nested(pairs) => {
                fields.push(source.clone(), FieldTarget::Nested(pairs.clone()));
            }
        }
    }
    (fields, filters)
}
