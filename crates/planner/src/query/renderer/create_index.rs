use crate::query::{
    ast::create_index::CreateIndex,
    renderer::{Render, Renderer},
};

impl Render for CreateIndex {
    fn render(&self, r: &mut Renderer) {
        let name = r.dialect.quote_identifier(&self.name);
        r.sql.push_str("CREATE INDEX ");
        r.sql.push_str(&name);
        r.sql.push_str(" ON ");
        r.render_table_ref(&self.table);
        r.sql.push(' ');
        r.render_column_list(&self.columns);
        r.sql.push(';');
    }
}
