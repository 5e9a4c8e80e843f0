pub mod alter_table;
pub mod common;
pub mod create_index;
pub mod create_table;
pub mod expr;
pub mod insert;
pub mod select;
pub mod truncate;
