//! Lifts captured values out of predicate trees so that value changes do
//! not change the query shape.

use crate::context::QueryContext;
use model::expr::Expr;

/// Rewrites every captured value in `expr`. With `parameterize` on, each
/// capture becomes a named parameter and its value is recorded on the
/// context; with it off (precompiled queries), the value is inlined as a
/// literal and becomes part of the query shape.
pub fn extract_parameters(expr: &Expr, context: &QueryContext, parameterize: bool) -> Expr {
    expr.rewrite(&mut |node| match node {
        Expr::Captured { name, value } => {
            if parameterize {
                let slot = context.record_capture(name, value.clone());
                Some(Expr::Parameter(slot))
            } else {
                Some(Expr::Value(value.clone()))
            }
        }
        _ => None,
    })
}
