pub mod column_type;
pub mod structure;
pub mod utils;
pub mod value;
