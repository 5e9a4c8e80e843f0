use crate::query::{
    ast::alter_table::{AlterTable, AlterTableOperation},
    renderer::{Render, Renderer},
};

impl Render for AlterTable {
    fn render(&self, r: &mut Renderer) {
        r.sql.push_str("ALTER TABLE ");
        r.render_table_ref(&self.table);
        r.sql.push(' ');

        for (i, operation) in self.operations.iter().enumerate() {
            if i > 0 {
                r.sql.push_str(", ");
            }
            match operation {
                AlterTableOperation::AddColumn { column } => {
                    r.sql.push_str("ADD COLUMN ");
                    column.render(r);
                }
            }
        }
        r.sql.push(';');
    }
}

#[cfg(test)]
mod tests {
    use crate::query::{
        builder::alter_table::AlterTableBuilder,
        dialect::{MySql, Postgres},
        renderer::{Render, Renderer},
    };
    use crate::table_ref;
    use model::core::column_type::ColumnType;

    #[test]
    fn test_render_add_columns() {
        let ast = AlterTableBuilder::new(table_ref!("users"))
            .add_column("bot", ColumnType::parse("tinyint"))
            .add_column("bio", ColumnType::parse("text"))
            .build();

        let mut renderer = Renderer::new(&Postgres);
        ast.render(&mut renderer);
        let (sql, _) = renderer.finish();
        assert_eq!(
            sql,
            r#"ALTER TABLE "users" ADD COLUMN "bot" SMALLINT, ADD COLUMN "bio" TEXT;"#
        );

        let mut renderer = Renderer::new(&MySql);
        ast.render(&mut renderer);
        let (sql, _) = renderer.finish();
        assert_eq!(
            sql,
            "ALTER TABLE `users` ADD COLUMN `bot` TINYINT, ADD COLUMN `bio` TEXT;"
        );
    }
}
