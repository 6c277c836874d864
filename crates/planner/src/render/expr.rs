use crate::{
    ast::expr::{BinaryOperator, ColumnRef, SqlBinaryOp, SqlExpr},
    render::{Render, Renderer},
};

impl Render for SqlExpr {
    fn render(&self, r: &mut Renderer) {
        match self {
            SqlExpr::Column(col) => col.render(r),
            SqlExpr::Value(val) => r.add_value(val.clone()),
            SqlExpr::Placeholder(name) => r.add_named(name),
            SqlExpr::Binary(op) => op.render(r),
            SqlExpr::Not(expr) => {
                r.sql.push_str("NOT (");
                expr.render(r);
                r.sql.push(')');
            }
            SqlExpr::Function { name, args } => {
                r.sql.push_str(name);
                r.sql.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        r.sql.push_str(", ");
                    }
                    arg.render(r);
                }
                r.sql.push(')');
            }
            SqlExpr::InSubquery { needle, subquery } => {
                needle.render(r);
                r.sql.push_str(" IN (");
                subquery.render(r);
                r.sql.push(')');
            }
        }
    }
}

impl Render for ColumnRef {
    fn render(&self, r: &mut Renderer) {
        r.sql.push_str(&r.dialect.quote_identifier(&self.table));
        r.sql.push('.');
        r.sql.push_str(&r.dialect.quote_identifier(&self.name));
    }
}

impl Render for SqlBinaryOp {
    fn render(&self, r: &mut Renderer) {
        r.sql.push('(');
        self.left.render(r);

        let op_str = match self.op {
            BinaryOperator::Eq => " = ",
            BinaryOperator::NotEq => " <> ",
            BinaryOperator::Lt => " < ",
            BinaryOperator::LtEq => " <= ",
            BinaryOperator::Gt => " > ",
            BinaryOperator::GtEq => " >= ",
            BinaryOperator::And => " AND ",
            BinaryOperator::Or => " OR ",
        };
        r.sql.push_str(op_str);

        self.right.render(r);
        r.sql.push(')');
    }
}
