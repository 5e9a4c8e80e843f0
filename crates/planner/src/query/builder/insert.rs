use crate::query::ast::{common::TableRef, expr::Expr, insert::Insert};

#[derive(Debug, Clone)]
pub struct InsertBuilder {
    ast: Insert,
}

impl InsertBuilder {
    pub fn new(table: TableRef) -> Self {
        Self {
            ast: Insert {
                table,
                ..Default::default()
            },
        }
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.ast.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn values(mut self, row: Vec<Expr>) -> Self {
        self.ast.values.push(row);
        self
    }

    pub fn ignore_conflicts(mut self, ignore: bool) -> Self {
        self.ast.ignore_conflicts = ignore;
        self
    }

    pub fn build(self) -> Insert {
        self.ast
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{table_ref, values};
    use model::core::value::Value;

    #[test]
    fn test_insert_builder_collects_rows() {
        let ast = InsertBuilder::new(table_ref!("users"))
            .columns(&["id", "name"])
            .values(values![Value::Int(1), Value::from("a")])
            .values(values![Value::Int(2), Value::Null])
            .ignore_conflicts(true)
            .build();

        assert_eq!(ast.columns, vec!["id", "name"]);
        assert_eq!(ast.values.len(), 2);
        assert!(ast.ignore_conflicts);
    }
}
