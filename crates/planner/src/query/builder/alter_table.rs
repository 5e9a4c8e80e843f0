use crate::query::ast::{
    alter_table::{AlterTable, AlterTableOperation},
    common::TableRef,
    create_table::ColumnDef,
};
use model::core::column_type::ColumnType;

#[derive(Debug, Clone)]
pub struct AlterTableBuilder {
    ast: AlterTable,
}

impl AlterTableBuilder {
    pub fn new(table: TableRef) -> Self {
        Self {
            ast: AlterTable {
                table,
                operations: Vec::new(),
            },
        }
    }

    pub fn add_column(mut self, name: &str, column_type: ColumnType) -> Self {
        self.ast.operations.push(AlterTableOperation::AddColumn {
            column: ColumnDef {
                name: name.to_string(),
                column_type,
                is_nullable: true,
            },
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ast.operations.is_empty()
    }

    pub fn build(self) -> AlterTable {
        self.ast
    }
}
