use crate::query::{
    ast::select::Select,
    renderer::{Render, Renderer},
};

impl Render for Select {
    fn render(&self, r: &mut Renderer) {
        r.sql.push_str("SELECT ");
        if self.distinct {
            r.sql.push_str("DISTINCT ");
        }
        let columns = self
            .columns
            .iter()
            .map(|c| r.dialect.quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ");
        r.sql.push_str(&columns);
        r.sql.push_str(" FROM ");
        r.render_table_ref(&self.table);
        r.sql.push(';');
    }
}

#[cfg(test)]
mod tests {
    use crate::query::{
        ast::select::Select,
        dialect::{MySql, Postgres},
        renderer::{Render, Renderer},
    };
    use crate::table_ref;

    fn render(ast: &Select, dialect: &dyn crate::query::dialect::Dialect) -> String {
        let mut renderer = Renderer::new(dialect);
        ast.render(&mut renderer);
        renderer.finish().0
    }

    #[test]
    fn test_render_select_distinct() {
        let ast = Select {
            table: table_ref!("discord_channels"),
            columns: vec!["id".to_string()],
            distinct: true,
        };

        assert_eq!(render(&ast, &Postgres), r#"SELECT DISTINCT "id" FROM "discord_channels";"#);
        assert_eq!(render(&ast, &MySql), "SELECT DISTINCT `id` FROM `discord_channels`;");
    }
}
