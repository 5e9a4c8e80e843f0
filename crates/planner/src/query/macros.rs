/// One row of bound parameters.
#[macro_export]
macro_rules! values {
    ($($val:expr),* $(,)?) => {
        vec![$($crate::query::ast::expr::Expr::Value($val)),*]
    };
}

/// `table_ref!("users")` or `table_ref!("public", "users")`.
#[macro_export]
macro_rules! table_ref {
    ($name:expr) => {
        $crate::query::ast::common::TableRef {
            schema: None,
            name: $name.to_string(),
        }
    };
    ($schema:expr, $name:expr) => {
        $crate::query::ast::common::TableRef {
            schema: Some($schema.to_string()),
            name: $name.to_string(),
        }
    };
}
