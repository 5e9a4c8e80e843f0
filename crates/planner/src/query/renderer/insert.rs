use crate::query::{
    ast::insert::Insert,
    renderer::{Render, Renderer},
};

impl Render for Insert {
    fn render(&self, r: &mut Renderer) {
        let on_conflict = r.dialect.supports_on_conflict();

        // 1. INSERT [IGNORE] INTO table (...)
        if self.ignore_conflicts && !on_conflict {
            r.sql.push_str("INSERT IGNORE INTO ");
        } else {
            r.sql.push_str("INSERT INTO ");
        }
        r.render_table_ref(&self.table);
        r.sql.push(' ');
        r.render_column_list(&self.columns);

        // 2. VALUES (...)
        render_values(self, r);

        if self.ignore_conflicts && on_conflict {
            r.sql.push_str(" ON CONFLICT DO NOTHING");
        }
        r.sql.push(';');
    }
}

fn render_values(insert: &Insert, r: &mut Renderer) {
    r.sql.push_str(" VALUES ");
    for (i, row) in insert.values.iter().enumerate() {
        if i > 0 {
            r.sql.push_str(", ");
        }
        r.sql.push('(');
        for (j, val) in row.iter().enumerate() {
            if j > 0 {
                r.sql.push_str(", ");
            }
            val.render(r);
        }
        r.sql.push(')');
    }
}

#[cfg(test)]
mod tests {
    use model::core::value::Value;

    use crate::query::{
        ast::{common::TableRef, expr::Expr, insert::Insert},
        dialect::{MySql, Postgres},
        renderer::{Render, Renderer},
    };

    fn value(val: Value) -> Expr {
        Expr::Value(val)
    }

    fn users_insert(ignore_conflicts: bool) -> Insert {
        Insert {
            table: TableRef {
                schema: None,
                name: "users".to_string(),
            },
            columns: vec!["name".to_string(), "is_active".to_string()],
            values: vec![
                vec![
                    value(Value::String("Alice".to_string())),
                    value(Value::Boolean(true)),
                ],
                vec![value(Value::String("Bob".to_string())), value(Value::Null)],
            ],
            ignore_conflicts,
        }
    }

    #[test]
    fn test_render_batch_insert_postgres() {
        let dialect = Postgres;
        let mut renderer = Renderer::new(&dialect);
        users_insert(false).render(&mut renderer);
        let (sql, params) = renderer.finish();

        let expected_sql =
            r#"INSERT INTO "users" ("name", "is_active") VALUES ($1, $2), ($3, $4);"#;
        assert_eq!(sql, expected_sql);
        assert_eq!(
            params,
            vec![
                Value::String("Alice".to_string()),
                Value::Boolean(true),
                Value::String("Bob".to_string()),
                Value::Null
            ]
        );
    }

    #[test]
    fn test_render_batch_insert_mysql() {
        let dialect = MySql;
        let mut renderer = Renderer::new(&dialect);
        users_insert(false).render(&mut renderer);
        let (sql, params) = renderer.finish();

        let expected_sql = "INSERT INTO `users` (`name`, `is_active`) VALUES (?, ?), (?, ?);";
        assert_eq!(sql, expected_sql);
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn test_render_ignore_conflicts_per_dialect() {
        let mut renderer = Renderer::new(&MySql);
        users_insert(true).render(&mut renderer);
        let (sql, _) = renderer.finish();
        assert!(sql.starts_with("INSERT IGNORE INTO `users`"));

        let mut renderer = Renderer::new(&Postgres);
        users_insert(true).render(&mut renderer);
        let (sql, _) = renderer.finish();
        assert!(sql.starts_with(r#"INSERT INTO "users""#));
        assert!(sql.ends_with(" ON CONFLICT DO NOTHING;"));
    }
}
