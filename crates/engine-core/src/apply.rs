//! Translates predicate trees into SQL and injects entity filters into
//! every query scope that touches a filtered type.

use crate::error::EngineError;
use crate::filters::QueryFilters;
use model::entity::{EntityModel, EntityType};
use model::expr::Expr;
use model::filter::FilterContext;
use planner::ast::expr::{sql_and, ColumnRef, SqlBinaryOp, SqlExpr};
use planner::ast::select::Select;
use tracing::debug;

/// Functions the SQL backends agree on. Anything else makes the
/// enclosing filter untranslatable.
const KNOWN_FUNCTIONS: &[&str] = &["LOWER", "UPPER", "LENGTH", "ABS", "COALESCE"];

struct Scope {
    entity: EntityType,
    alias: String,
}

/// Walks a predicate tree and produces SQL, resolving properties
/// against the innermost query scope that has the column. Returns
/// `None` for anything the backend cannot express.
pub struct SqlTranslator<'a> {
    model: &'a EntityModel,
    filters: &'a QueryFilters,
    filter_context: &'a FilterContext,
    scopes: Vec<Scope>,
    // Entity types whose filters are being applied further up the
    // tree; their filters are not re-injected below, which keeps
    // self-referential filters from recursing forever.
    active: Vec<EntityType>,
    next_alias: usize,
}

impl<'a> SqlTranslator<'a> {
    fn new(
        model: &'a EntityModel,
        filters: &'a QueryFilters,
        filter_context: &'a FilterContext,
        entity: EntityType,
        alias: &str,
        active: Vec<EntityType>,
    ) -> Self {
        SqlTranslator {
            model,
            filters,
            filter_context,
            scopes: vec![Scope {
                entity,
                alias: alias.to_string(),
            }],
            active,
            next_alias: 1,
        }
    }

    /// `Ok(None)` means the backend cannot express the predicate; an
    /// `Err` is a configuration failure surfaced while resolving the
    /// filters of a referenced entity.
    pub fn translate(&mut self, expr: &Expr) -> Result<Option<SqlExpr>, EngineError> {
        let translated = match expr {
            Expr::Property(name) => self.resolve_property(name),
            Expr::Value(val) => Some(SqlExpr::Value(val.clone())),
            // Captures are normally lifted before translation; one that
            // survives is inlined as a literal.
            Expr::Captured { value, .. } => Some(SqlExpr::Value(value.clone())),
            Expr::Parameter(name) => Some(SqlExpr::Placeholder(name.clone())),
            Expr::Binary(op) => match (self.translate(&op.left)?, self.translate(&op.right)?) {
                (Some(left), Some(right)) => Some(SqlExpr::Binary(Box::new(SqlBinaryOp {
                    left,
                    op: op.op,
                    right,
                }))),
                _ => None,
            },
            Expr::Not(inner) => self.translate(inner)?.map(|e| SqlExpr::Not(Box::new(e))),
            Expr::Function { name, args } => {
                if !KNOWN_FUNCTIONS.contains(&name.to_uppercase().as_str()) {
                    debug!(function = %name, "unknown function, predicate is untranslatable");
                    return Ok(None);
                }
                args.iter()
                    .map(|arg| self.translate(arg))
                    .collect::<Result<Option<Vec<_>>, _>>()?
                    .map(|args| SqlExpr::Function {
                        name: name.clone(),
                        args,
                    })
            }
            Expr::InSubquery {
                needle,
                entity,
                projection,
                predicate,
            } => self.translate_subquery(needle, entity, projection, predicate.as_deref())?,
        };
        Ok(translated)
    }

    /// Resolves a property against the innermost scope first, so
    /// subquery predicates can correlate with outer scopes.
    fn resolve_property(&self, name: &str) -> Option<SqlExpr> {
        for scope in self.scopes.iter().rev() {
            if self.model.has_column(&scope.entity, name) {
                return Some(SqlExpr::Column(ColumnRef {
                    table: scope.alias.clone(),
                    name: name.to_string(),
                }));
            }
        }
        debug!(property = %name, "property not found in any query scope");
        None
    }

    fn translate_subquery(
        &mut self,
        needle: &Expr,
        entity: &EntityType,
        projection: &str,
        predicate: Option<&Expr>,
    ) -> Result<Option<SqlExpr>, EngineError> {
        let Some(needle) = self.translate(needle)? else {
            return Ok(None);
        };
        let Some(meta) = self.model.entity(entity) else {
            return Ok(None);
        };

        let alias = format!("t{}", self.next_alias);
        self.next_alias += 1;

        let mut select = Select::new(&meta.table, &alias);
        select.columns = vec![SqlExpr::Column(ColumnRef {
            table: alias.clone(),
            name: projection.to_string(),
        })];

        self.scopes.push(Scope {
            entity: entity.clone(),
            alias,
        });
        let filled = self.fill_subquery(entity, predicate, &mut select);
        self.scopes.pop();

        if !filled? {
            return Ok(None);
        }
        Ok(Some(SqlExpr::InSubquery {
            needle: Box::new(needle),
            subquery: Box::new(select),
        }))
    }

    /// Translates the subquery predicate and injects the sub-entity's
    /// filters. `Ok(false)` when the predicate is untranslatable.
    fn fill_subquery(
        &mut self,
        entity: &EntityType,
        predicate: Option<&Expr>,
        select: &mut Select,
    ) -> Result<bool, EngineError> {
        if let Some(p) = predicate {
            match self.translate(p)? {
                Some(condition) => select.and_where(condition),
                None => return Ok(false),
            }
        }
        self.inject_filters(entity, select)?;
        Ok(true)
    }

    /// Applies the sub-entity's own filters inside its scope, unless
    /// that entity is already being filtered further up the tree.
    /// Untranslatable filters are skipped; resolution failures are
    /// fatal and propagate.
    fn inject_filters(&mut self, entity: &EntityType, select: &mut Select) -> Result<(), EngineError> {
        if self.active.contains(entity) {
            return Ok(());
        }
        let resolved = self.filters.resolve_for_type(self.filter_context, entity)?;

        self.active.push(entity.clone());
        for expr in &resolved.expressions {
            match self.translate(expr) {
                Ok(Some(condition)) => select.and_where(condition),
                Ok(None) => {
                    debug!(entity = %entity, "skipping untranslatable query filter in subquery");
                }
                Err(err) => {
                    self.active.pop();
                    return Err(err);
                }
            }
        }
        self.active.pop();
        Ok(())
    }
}

/// Applies entity filters to a query. Filters are conjoined with AND
/// after any existing predicate, so the user predicate stays leftmost
/// in the rendered SQL.
pub struct QueryFilterApplicator<'a> {
    model: &'a EntityModel,
    filters: &'a QueryFilters,
    filter_context: &'a FilterContext,
}

impl<'a> QueryFilterApplicator<'a> {
    pub fn new(
        model: &'a EntityModel,
        filters: &'a QueryFilters,
        filter_context: &'a FilterContext,
    ) -> Self {
        QueryFilterApplicator {
            model,
            filters,
            filter_context,
        }
    }

    /// Translates a user predicate in the scope of `entity`. Filters of
    /// entities referenced through subqueries are injected along the way.
    pub fn translate(
        &self,
        entity: &EntityType,
        alias: &str,
        expr: &Expr,
    ) -> Result<Option<SqlExpr>, EngineError> {
        let mut translator = SqlTranslator::new(
            self.model,
            self.filters,
            self.filter_context,
            entity.clone(),
            alias,
            Vec::new(),
        );
        translator.translate(expr)
    }

    /// Resolves the filters of `entity` and conjoins them onto
    /// `existing`, which stays the leftmost operand. Untranslatable
    /// filters are skipped; `existing` comes back unchanged when no
    /// filter applies.
    pub fn apply_to_predicate(
        &self,
        entity: &EntityType,
        alias: &str,
        existing: Option<SqlExpr>,
    ) -> Result<Option<SqlExpr>, EngineError> {
        let resolved = self.filters.resolve_for_type(self.filter_context, entity)?;

        let mut combined = existing;
        for expr in &resolved.expressions {
            let mut translator = SqlTranslator::new(
                self.model,
                self.filters,
                self.filter_context,
                entity.clone(),
                alias,
                vec![entity.clone()],
            );
            match translator.translate(expr)? {
                Some(condition) => {
                    combined = Some(match combined {
                        Some(left) => sql_and(left, condition),
                        None => condition,
                    });
                }
                None => {
                    debug!(entity = %entity, "skipping untranslatable query filter");
                }
            }
        }
        Ok(combined)
    }

    /// Same resolution, but mutates the WHERE clause of `select` in
    /// place.
    pub fn apply_to_select(
        &self,
        entity: &EntityType,
        alias: &str,
        select: &mut Select,
    ) -> Result<(), EngineError> {
        select.predicate = self.apply_to_predicate(entity, alias, select.predicate.take())?;
        Ok(())
    }
}
