use model::{
    core::{
        structure::{KeyKind, TableStructure},
        value::Value,
    },
    records::row::Row,
};
use planner::query::{
    ast::{create_index::CreateIndex, expr::Expr, select::Select, truncate::Truncate},
    builder::{
        alter_table::AlterTableBuilder, create_table::CreateTableBuilder, insert::InsertBuilder,
    },
    dialect::Dialect,
    renderer::{Render, Renderer},
};
use planner::table_ref;

pub struct QueryGenerator<'a> {
    dialect: &'a dyn Dialect,
}

impl<'a> QueryGenerator<'a> {
    pub fn new(dialect: &'a dyn Dialect) -> Self {
        Self { dialect }
    }

    /// CREATE TABLE followed by one CREATE INDEX per plain index key.
    ///
    /// Primary and unique keys become table constraints; all columns are
    /// nullable.
    pub fn create_table(&self, table: &str, structure: &TableStructure) -> Vec<String> {
        let builder = structure
            .columns()
            .iter()
            .fold(CreateTableBuilder::new(table_ref!(table)), |b, col| {
                b.column(&col.name, col.column_type.clone())
            });

        let builder = structure
            .keys()
            .iter()
            .fold(builder, |b, key| match key.kind {
                KeyKind::Primary => b.primary_key(key.columns.clone()),
                KeyKind::Unique => b.unique(&key.name, key.columns.clone()),
                KeyKind::Index => b,
            });

        let mut statements = vec![self.render_ast(builder.build()).0];
        statements.extend(
            structure
                .keys()
                .iter()
                .filter(|key| key.kind == KeyKind::Index)
                .map(|key| {
                    let index = CreateIndex {
                        name: key.name.clone(),
                        table: table_ref!(table),
                        columns: key.columns.clone(),
                    };
                    self.render_ast(index).0
                }),
        );
        statements
    }

    /// One ALTER TABLE adding every column of `missing`; `None` when empty.
    pub fn add_columns(&self, table: &str, missing: &TableStructure) -> Option<String> {
        let builder = missing
            .columns()
            .iter()
            .fold(AlterTableBuilder::new(table_ref!(table)), |b, col| {
                b.add_column(&col.name, col.column_type.clone())
            });

        if builder.is_empty() {
            return None;
        }
        Some(self.render_ast(builder.build()).0)
    }

    pub fn insert_batch(
        &self,
        table: &str,
        columns: &[String],
        rows: &[Row],
        ignore_conflicts: bool,
    ) -> (String, Vec<Value>) {
        if rows.is_empty() || columns.is_empty() {
            return (String::new(), Vec::new());
        }

        let column_refs: Vec<&str> = columns.iter().map(String::as_str).collect();
        let builder = rows.iter().fold(
            InsertBuilder::new(table_ref!(table))
                .columns(&column_refs)
                .ignore_conflicts(ignore_conflicts),
            |b, row| {
                let ordered: Vec<Expr> = row
                    .ordered_values(columns)
                    .into_iter()
                    .map(Expr::Value)
                    .collect();
                b.values(ordered)
            },
        );

        self.render_ast(builder.build())
    }

    pub fn truncate(&self, table: &str) -> String {
        let ast = Truncate {
            table: table_ref!(table),
        };
        self.render_ast(ast).0
    }

    /// Distinct values of one column.
    pub fn select_column(&self, table: &str, column: &str) -> String {
        let ast = Select {
            table: table_ref!(table),
            columns: vec![column.to_string()],
            distinct: true,
        };
        self.render_ast(ast).0
    }

    pub fn integrity_checks(&self, enabled: bool) -> Vec<String> {
        self.dialect.integrity_checks(enabled)
    }

    fn render_ast(&self, ast: impl Render) -> (String, Vec<Value>) {
        let mut renderer = Renderer::new(self.dialect);
        ast.render(&mut renderer);
        renderer.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use planner::query::dialect::{MySql, Postgres};

    #[test]
    fn test_create_table_with_index_keys() {
        let structure = TableStructure::from_tags(&[
            ("id", "varchar(100)"),
            ("channel_id", "varchar(100)"),
            ("pinned", "tinyint"),
        ])
        .key("pk", KeyKind::Primary, &["id"])
        .key("by_channel", KeyKind::Index, &["channel_id"]);

        let statements = QueryGenerator::new(&MySql).create_table("messages", &structure);
        assert_eq!(
            statements,
            vec![
                concat!(
                    "CREATE TABLE `messages` (`id` VARCHAR(100), `channel_id` VARCHAR(100), ",
                    "`pinned` TINYINT, PRIMARY KEY (`id`));"
                )
                .to_string(),
                "CREATE INDEX `by_channel` ON `messages` (`channel_id`);".to_string(),
            ]
        );
    }

    #[test]
    fn test_add_columns_skips_empty_structure() {
        let generator = QueryGenerator::new(&Postgres);
        assert_eq!(generator.add_columns("users", &TableStructure::new()), None);

        let missing = TableStructure::from_tags(&[("bot", "tinyint")]);
        assert_eq!(
            generator.add_columns("users", &missing).as_deref(),
            Some(r#"ALTER TABLE "users" ADD COLUMN "bot" SMALLINT;"#)
        );
    }

    #[test]
    fn test_insert_batch_orders_values_by_columns() {
        let mut first = Row::new();
        first.insert("name", Value::from("Alice"));
        first.insert("id", Value::Int(1));
        let mut second = Row::new();
        second.insert("id", Value::Int(2));

        let columns = vec!["id".to_string(), "name".to_string()];
        let (sql, params) =
            QueryGenerator::new(&Postgres).insert_batch("users", &columns, &[first, second], true);

        assert_eq!(
            sql,
            r#"INSERT INTO "users" ("id", "name") VALUES ($1, $2), ($3, $4) ON CONFLICT DO NOTHING;"#
        );
        assert_eq!(
            params,
            vec![Value::Int(1), Value::from("Alice"), Value::Int(2), Value::Null]
        );
    }

    #[test]
    fn test_select_column() {
        assert_eq!(
            QueryGenerator::new(&MySql).select_column("discord_channels", "id"),
            "SELECT DISTINCT `id` FROM `discord_channels`;"
        );
    }

    #[test]
    fn test_insert_batch_empty_rows() {
        let (sql, params) =
            QueryGenerator::new(&MySql).insert_batch("users", &["id".to_string()], &[], false);
        assert!(sql.is_empty());
        assert!(params.is_empty());
    }
}
