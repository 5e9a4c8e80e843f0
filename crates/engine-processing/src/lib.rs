pub mod transform;

pub use transform::normalizer::{Normalizer, normalize, split_rich_map};
