//! Defines the AST for an ALTER TABLE statement.
//!
//! Table evolution is additive, so adding columns is the only operation.

use crate::query::ast::{common::TableRef, create_table::ColumnDef};

#[derive(Debug, Clone)]
pub struct AlterTable {
    pub table: TableRef,
    pub operations: Vec<AlterTableOperation>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlterTableOperation {
    AddColumn { column: ColumnDef },
}
