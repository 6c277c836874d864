//! Defines the AST for a SELECT query.

use crate::ast::expr::{sql_and, SqlExpr};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRef {
    pub table: String,
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Select {
    /// The columns to be returned.
    pub columns: Vec<SqlExpr>,

    /// The table the query selects from, with its alias.
    pub from: TableRef,

    /// The WHERE clause condition.
    pub predicate: Option<SqlExpr>,

    /// The LIMIT clause.
    pub limit: Option<u64>,
}

impl Select {
    pub fn new(table: &str, alias: &str) -> Self {
        Select {
            columns: Vec::new(),
            from: TableRef {
                table: table.to_string(),
                alias: alias.to_string(),
            },
            predicate: None,
            limit: None,
        }
    }

    /// Conjoins `condition` onto the existing predicate with AND; the
    /// existing predicate stays leftmost.
    pub fn and_where(&mut self, condition: SqlExpr) {
        self.predicate = Some(match self.predicate.take() {
            Some(existing) => sql_and(existing, condition),
            None => condition,
        });
    }
}
