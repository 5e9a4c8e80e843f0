use crate::query::ast::{
    common::TableRef,
    create_table::{ColumnDef, CreateTable, TableConstraint},
};
use model::core::column_type::ColumnType;

#[derive(Debug, Clone)]
pub struct CreateTableBuilder {
    ast: CreateTable,
}

impl CreateTableBuilder {
    pub fn new(table: TableRef) -> Self {
        Self {
            ast: CreateTable {
                table,
                ..Default::default()
            },
        }
    }

    pub fn if_not_exists(mut self) -> Self {
        self.ast.if_not_exists = true;
        self
    }

    /// Adds a nullable column.
    pub fn column(mut self, name: &str, column_type: ColumnType) -> Self {
        self.ast.columns.push(ColumnDef {
            name: name.to_string(),
            column_type,
            is_nullable: true,
        });
        self
    }

    pub fn primary_key(mut self, columns: Vec<String>) -> Self {
        self.ast
            .constraints
            .push(TableConstraint::PrimaryKey { columns });
        self
    }

    pub fn unique(mut self, name: &str, columns: Vec<String>) -> Self {
        self.ast.constraints.push(TableConstraint::Unique {
            name: name.to_string(),
            columns,
        });
        self
    }

    pub fn build(self) -> CreateTable {
        self.ast
    }
}
