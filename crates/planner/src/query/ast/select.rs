//! Defines the Abstract Syntax Tree (AST) for a single-table SELECT.

use crate::query::ast::common::TableRef;

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub table: TableRef,
    pub columns: Vec<String>,
    /// `SELECT DISTINCT`
    pub distinct: bool,
}
