use crate::ast::expr::{ColumnRef, SqlExpr};
use model::core::value::Value;

pub mod ast;
pub mod dialect;
pub mod render;

pub fn column(table: &str, name: &str) -> SqlExpr {
    SqlExpr::Column(ColumnRef {
        table: table.to_string(),
        name: name.to_string(),
    })
}

pub fn value(val: Value) -> SqlExpr {
    SqlExpr::Value(val)
}

pub fn placeholder(name: &str) -> SqlExpr {
    SqlExpr::Placeholder(name.to_string())
}
