use crate::{
    ast::select::Select,
    render::{Render, Renderer},
};

impl Render for Select {
    fn render(&self, r: &mut Renderer) {
        // 1. SELECT clause
        r.sql.push_str("SELECT ");
        for (i, col) in self.columns.iter().enumerate() {
            if i > 0 {
                r.sql.push_str(", ");
            }
            col.render(r);
        }

        // 2. FROM
        r.sql.push_str(" FROM ");
        r.sql
            .push_str(&r.dialect.quote_identifier(&self.from.table));
        r.sql.push_str(" AS ");
        r.sql
            .push_str(&r.dialect.quote_identifier(&self.from.alias));

        // 3. WHERE
        if let Some(predicate) = &self.predicate {
            r.sql.push_str(" WHERE ");
            predicate.render(r);
        }

        // 4. LIMIT
        if let Some(limit) = &self.limit {
            r.sql.push_str(" LIMIT ");
            r.sql.push_str(&limit.to_string());
        }
    }
}
