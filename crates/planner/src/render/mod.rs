//! Defines the core rendering trait and context for converting AST to SQL.

use crate::dialect::Dialect;
use model::core::value::Value;

pub mod expr;
pub mod select;

/// A trait for any AST node that can be rendered into a SQL string.
pub trait Render {
    fn render(&self, renderer: &mut Renderer);
}

/// A bind slot produced while rendering. Literal values carry the value
/// itself; named placeholders are resolved against the execution context
/// at bind time.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Value(Value),
    Named(String),
}

/// A context that holds the state during the rendering process.
///
/// It accumulates the SQL string and the parameters, and provides
/// access to the dialect for syntax-specific details.
pub struct Renderer<'a> {
    pub sql: String,
    pub params: Vec<SqlParam>,
    pub dialect: &'a dyn Dialect,
}

impl<'a> Renderer<'a> {
    pub fn new(dialect: &'a dyn Dialect) -> Self {
        Self {
            sql: String::new(),
            params: Vec::new(),
            dialect,
        }
    }

    /// Consumes the renderer and returns the final SQL string and parameters.
    pub fn finish(self) -> (String, Vec<SqlParam>) {
        (self.sql, self.params)
    }

    pub fn add_value(&mut self, value: Value) {
        self.add_param(SqlParam::Value(value));
    }

    pub fn add_named(&mut self, name: &str) {
        self.add_param(SqlParam::Named(name.to_string()));
    }

    fn add_param(&mut self, param: SqlParam) {
        self.params.push(param);
        let placeholder = self.dialect.get_placeholder(self.params.len() - 1);
        self.sql.push_str(&placeholder);
    }
}
