pub mod alter_table;
pub mod create_table;
pub mod insert;
