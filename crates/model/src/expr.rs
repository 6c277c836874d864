//! Defines the AST for entity-level predicate expressions.
//!
//! Filters and query predicates are written against entity properties;
//! translation to SQL happens later, against a concrete select scope.

use crate::core::value::Value;
use crate::entity::EntityType;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use xxhash_rust::xxh3::Xxh3;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    /// An entity property access, e.g. `client_id`.
    Property(String),

    /// A literal value. Literals are part of the expression shape:
    /// two filters differing only in a literal produce different keys.
    Value(Value),

    /// A value captured from the runtime environment (current user,
    /// tenant id, ...). Parameter extraction lifts these into named
    /// query parameters so the compiled SQL can be replayed.
    Captured { name: String, value: Value },

    /// A named query parameter produced by parameter extraction.
    Parameter(String),

    /// A binary operation, e.g. `client_id = 2` or `a AND b`.
    Binary(Box<BinaryOp>),

    /// Logical negation.
    Not(Box<Expr>),

    /// A function call, e.g. `LOWER(name)`. Unknown functions are
    /// untranslatable and dropped at filter-application time.
    Function { name: String, args: Vec<Expr> },

    /// A membership test against another entity's rows:
    /// `needle IN (SELECT projection FROM entity WHERE predicate)`.
    InSubquery {
        needle: Box<Expr>,
        entity: EntityType,
        projection: String,
        predicate: Option<Box<Expr>>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BinaryOp {
    pub left: Expr,
    pub op: BinaryOperator,
    pub right: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
    // Comparison
    Eq,    // =
    NotEq, // <>
    Lt,    // <
    LtEq,  // <=
    Gt,    // >
    GtEq,  // >=

    // Logical
    And,
    Or,
}

impl Expr {
    /// An order-sensitive structural hash over the expression tree.
    /// Equal expressions hash equal; the converse is best-effort.
    pub fn structural_hash(&self) -> u64 {
        let mut hasher = Xxh3::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    /// Pre-order rewrite: `f` is offered every node, outermost first.
    /// A `Some` result replaces the node wholesale (children are not
    /// revisited); `None` recurses into the children.
    pub fn rewrite(&self, f: &mut impl FnMut(&Expr) -> Option<Expr>) -> Expr {
        if let Some(replaced) = f(self) {
            return replaced;
        }
        match self {
            Expr::Binary(op) => Expr::Binary(Box::new(BinaryOp {
                left: op.left.rewrite(f),
                op: op.op,
                right: op.right.rewrite(f),
            })),
            Expr::Not(inner) => Expr::Not(Box::new(inner.rewrite(f))),
            Expr::Function { name, args } => Expr::Function {
                name: name.clone(),
                args: args.iter().map(|a| a.rewrite(f)).collect(),
            },
            Expr::InSubquery {
                needle,
                entity,
                projection,
                predicate,
            } => Expr::InSubquery {
                needle: Box::new(needle.rewrite(f)),
                entity: entity.clone(),
                projection: projection.clone(),
                predicate: predicate.as_ref().map(|p| Box::new(p.rewrite(f))),
            },
            leaf => leaf.clone(),
        }
    }
}

pub fn property(name: &str) -> Expr {
    Expr::Property(name.to_string())
}

pub fn value(val: Value) -> Expr {
    Expr::Value(val)
}

pub fn captured(name: &str, val: Value) -> Expr {
    Expr::Captured {
        name: name.to_string(),
        value: val,
    }
}

pub fn parameter(name: &str) -> Expr {
    Expr::Parameter(name.to_string())
}

fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Expr {
    Expr::Binary(Box::new(BinaryOp { left, op, right }))
}

pub fn eq(left: Expr, right: Expr) -> Expr {
    binary(left, BinaryOperator::Eq, right)
}

pub fn not_eq(left: Expr, right: Expr) -> Expr {
    binary(left, BinaryOperator::NotEq, right)
}

pub fn lt(left: Expr, right: Expr) -> Expr {
    binary(left, BinaryOperator::Lt, right)
}

pub fn gt(left: Expr, right: Expr) -> Expr {
    binary(left, BinaryOperator::Gt, right)
}

pub fn lt_eq(left: Expr, right: Expr) -> Expr {
    binary(left, BinaryOperator::LtEq, right)
}

pub fn gt_eq(left: Expr, right: Expr) -> Expr {
    binary(left, BinaryOperator::GtEq, right)
}

pub fn and(left: Expr, right: Expr) -> Expr {
    binary(left, BinaryOperator::And, right)
}

pub fn or(left: Expr, right: Expr) -> Expr {
    binary(left, BinaryOperator::Or, right)
}

/// Conjoins expressions left to right with AND; `None` for an empty
/// iterator.
pub fn and_all(exprs: impl IntoIterator<Item = Expr>) -> Option<Expr> {
    exprs.into_iter().reduce(and)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_hash_matches_for_equal_trees() {
        let a = gt(property("x"), value(Value::Int(0)));
        let b = gt(property("x"), value(Value::Int(0)));
        assert_eq!(a, b);
        assert_eq!(a.structural_hash(), b.structural_hash());
    }

    #[test]
    fn test_structural_hash_differs_for_different_literals() {
        let a = gt(property("x"), value(Value::Int(100)));
        let b = gt(property("x"), value(Value::Int(200)));
        assert_ne!(a, b);
        assert_ne!(a.structural_hash(), b.structural_hash());
    }

    #[test]
    fn test_and_all_conjoins_left_to_right() {
        let a = gt(property("x"), value(Value::Int(0)));
        let b = lt(property("x"), value(Value::Int(100)));
        let joined = and_all([a.clone(), b.clone()]).unwrap();
        assert_eq!(joined, and(a, b));
        assert!(and_all([]).is_none());
    }

    #[test]
    fn test_rewrite_replaces_captured_nodes() {
        let expr = and(
            eq(property("client_id"), captured("client_id", Value::Int(2))),
            gt(property("x"), value(Value::Int(0))),
        );
        let rewritten = expr.rewrite(&mut |e| match e {
            Expr::Captured { name, .. } => Some(parameter(name)),
            _ => None,
        });
        assert_eq!(
            rewritten,
            and(
                eq(property("client_id"), parameter("client_id")),
                gt(property("x"), value(Value::Int(0))),
            )
        );
    }

    #[test]
    fn test_rewrite_reaches_subquery_predicates() {
        let expr = Expr::InSubquery {
            needle: Box::new(property("id")),
            entity: EntityType::new("Exam"),
            projection: "video_id".to_string(),
            predicate: Some(Box::new(eq(
                property("candidate_id"),
                captured("user_id", Value::Int(7)),
            ))),
        };
        let rewritten = expr.rewrite(&mut |e| match e {
            Expr::Captured { name, .. } => Some(parameter(name)),
            _ => None,
        });
        match rewritten {
            Expr::InSubquery { predicate, .. } => {
                assert_eq!(
                    *predicate.unwrap(),
                    eq(property("candidate_id"), parameter("user_id"))
                );
            }
            other => panic!("unexpected rewrite result: {other:?}"),
        }
    }
}
