//! Defines the `Dialect` trait for database-specific SQL syntax.

use model::core::column_type::{ColumnType, IntWidth};

pub trait Dialect: Send + Sync {
    /// Wraps an identifier (like a table or column name) in the correct
    /// quotation marks for the dialect.
    ///
    /// - PostgreSQL uses double quotes: `"my_column"`
    /// - MySQL uses backticks: `` `my_column` ``
    fn quote_identifier(&self, ident: &str) -> String;

    /// Returns the placeholder for a parameterized query.
    ///
    /// - PostgreSQL uses `$1`, `$2`, etc.
    /// - MySQL uses `?`
    fn get_placeholder(&self, index: usize) -> String;

    /// Renders a structure type tag into a database-specific column type.
    ///
    /// `column` is needed by dialects that express enumerated columns as a
    /// check constraint on the column itself.
    fn render_column_type(&self, column: &str, column_type: &ColumnType) -> String;

    /// Statements that switch foreign key and uniqueness enforcement.
    fn integrity_checks(&self, enabled: bool) -> Vec<String>;

    /// True when duplicate rows are skipped with a trailing
    /// `ON CONFLICT DO NOTHING`, false for the `INSERT IGNORE` form.
    fn supports_on_conflict(&self) -> bool;

    /// Returns the name of the dialect (e.g., "PostgreSQL", "MySQL").
    fn name(&self) -> String;
}

/// Quotes a string literal, doubling embedded single quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn literal_list(options: &[String]) -> String {
    options
        .iter()
        .map(|o| quote_literal(o))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone)]
pub struct Postgres;

impl Dialect for Postgres {
    fn quote_identifier(&self, ident: &str) -> String {
        format!(r#""{}""#, ident.replace('"', "\"\""))
    }

    fn get_placeholder(&self, index: usize) -> String {
        // PostgreSQL uses $1, $2, etc.
        format!("${}", index + 1)
    }

    fn render_column_type(&self, column: &str, column_type: &ColumnType) -> String {
        match column_type {
            ColumnType::VarChar(len) => format!("VARCHAR({len})"),
            ColumnType::Binary => "BYTEA".into(),
            ColumnType::Text => "TEXT".into(),
            ColumnType::Integer(IntWidth::Tiny | IntWidth::Small) => "SMALLINT".into(),
            ColumnType::Integer(IntWidth::Medium | IntWidth::Regular) => "INTEGER".into(),
            ColumnType::Integer(IntWidth::Big) => "BIGINT".into(),
            ColumnType::Enum(options) => format!(
                "TEXT CHECK ({} IN ({}))",
                self.quote_identifier(column),
                literal_list(options)
            ),
            ColumnType::Other(name) => name.clone(),
        }
    }

    fn integrity_checks(&self, enabled: bool) -> Vec<String> {
        // `replica` skips FK triggers; requires a superuser or table owner.
        let role = if enabled { "origin" } else { "replica" };
        vec![format!("SET session_replication_role = {role}")]
    }

    fn supports_on_conflict(&self) -> bool {
        true
    }

    fn name(&self) -> String {
        "PostgreSQL".into()
    }
}

#[derive(Debug, Clone)]
pub struct MySql;

impl Dialect for MySql {
    fn quote_identifier(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    fn get_placeholder(&self, _index: usize) -> String {
        // MySQL uses ?
        "?".into()
    }

    fn render_column_type(&self, _column: &str, column_type: &ColumnType) -> String {
        match column_type {
            ColumnType::VarChar(len) => format!("VARCHAR({len})"),
            ColumnType::Binary => "BLOB".into(),
            ColumnType::Text => "TEXT".into(),
            ColumnType::Integer(width) => width.tag().to_ascii_uppercase(),
            ColumnType::Enum(options) => format!("ENUM({})", literal_list(options)),
            ColumnType::Other(name) => name.clone(),
        }
    }

    fn integrity_checks(&self, enabled: bool) -> Vec<String> {
        let flag = u8::from(enabled);
        vec![
            format!("SET foreign_key_checks = {flag}"),
            format!("SET unique_checks = {flag}"),
        ]
    }

    fn supports_on_conflict(&self) -> bool {
        false
    }

    fn name(&self) -> String {
        "MySQL".into()
    }
}
