use crate::query::{
    ast::truncate::Truncate,
    renderer::{Render, Renderer},
};

impl Render for Truncate {
    fn render(&self, r: &mut Renderer) {
        r.sql.push_str("TRUNCATE TABLE ");
        r.render_table_ref(&self.table);
        r.sql.push(';');
    }
}
