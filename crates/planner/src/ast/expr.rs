//! Defines the AST for SQL expressions.

use crate::ast::select::Select;
use model::core::value::Value;
use serde::{Deserialize, Serialize};

pub use model::expr::BinaryOperator;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlExpr {
    /// An alias-qualified column reference, e.g. `t0.client_id`.
    Column(ColumnRef),

    /// A literal value, hoisted into a bind slot at render time.
    Value(Value),

    /// A named query parameter, bound from the execution context.
    Placeholder(String),

    /// A binary operation, e.g. `t0.client_id = $1` or `a AND b`.
    Binary(Box<SqlBinaryOp>),

    /// Logical negation.
    Not(Box<SqlExpr>),

    /// A function call, e.g. `LOWER(t0.name)`.
    Function { name: String, args: Vec<SqlExpr> },

    /// A membership test against a sub-select.
    InSubquery {
        needle: Box<SqlExpr>,
        subquery: Box<Select>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: String, // the select alias, e.g. the 't0' in 't0.id'
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlBinaryOp {
    pub left: SqlExpr,
    pub op: BinaryOperator,
    pub right: SqlExpr,
}

/// `left AND right`.
pub fn sql_and(left: SqlExpr, right: SqlExpr) -> SqlExpr {
    SqlExpr::Binary(Box::new(SqlBinaryOp {
        left,
        op: BinaryOperator::And,
        right,
    }))
}
