use crate::query::{
    ast::create_table::{ColumnDef, CreateTable, TableConstraint},
    renderer::{Render, Renderer},
};

impl Render for CreateTable {
    fn render(&self, r: &mut Renderer) {
        r.sql.push_str("CREATE TABLE ");
        if self.if_not_exists {
            r.sql.push_str("IF NOT EXISTS ");
        }
        r.render_table_ref(&self.table);
        r.sql.push_str(" (");

        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                r.sql.push_str(", ");
            }
            column.render(r);
        }

        for constraint in &self.constraints {
            r.sql.push_str(", ");
            constraint.render(r);
        }

        r.sql.push_str(");");
    }
}

impl Render for ColumnDef {
    fn render(&self, r: &mut Renderer) {
        let name = r.dialect.quote_identifier(&self.name);
        let column_type = r.dialect.render_column_type(&self.name, &self.column_type);
        r.sql.push_str(&name);
        r.sql.push(' ');
        r.sql.push_str(&column_type);
        if !self.is_nullable {
            r.sql.push_str(" NOT NULL");
        }
    }
}

impl Render for TableConstraint {
    fn render(&self, r: &mut Renderer) {
        match self {
            TableConstraint::PrimaryKey { columns } => {
                r.sql.push_str("PRIMARY KEY ");
                r.render_column_list(columns);
            }
            TableConstraint::Unique { name, columns } => {
                let name = r.dialect.quote_identifier(name);
                r.sql.push_str("CONSTRAINT ");
                r.sql.push_str(&name);
                r.sql.push_str(" UNIQUE ");
                r.render_column_list(columns);
            }
        }
    }
}
