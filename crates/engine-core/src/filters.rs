//! Per-execution resolution of the model's filter definitions.

use crate::error::EngineError;
use model::entity::{EntityModel, EntityType};
use model::expr::Expr;
use model::filter::FilterContext;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Rewrites a resolved filter expression before it is memoized, lifting
/// captured values into the execution context.
pub type ParameterizeFn = Arc<dyn Fn(&Expr) -> Expr + Send + Sync>;

/// The filter expressions resolved for one entity type during one
/// execution.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeFilters {
    pub entity: EntityType,
    pub expressions: Vec<Expr>,
}

/// Execution-scoped filter resolver. One instance lives for one query
/// execution; each entity type is resolved at most once and memoized,
/// so a filter function runs once per execution no matter how many
/// query scopes reference its type.
pub struct QueryFilters {
    model: Arc<EntityModel>,
    parameterize: Mutex<Option<ParameterizeFn>>,
    state: Mutex<ResolvedState>,
}

#[derive(Default)]
struct ResolvedState {
    resolved: HashMap<EntityType, Arc<TypeFilters>>,
    order: Vec<EntityType>,
}

impl QueryFilters {
    pub fn new(model: Arc<EntityModel>) -> Self {
        QueryFilters {
            model,
            parameterize: Mutex::new(None),
            state: Mutex::new(ResolvedState::default()),
        }
    }

    /// Must be set before the first resolution; resolving without it is
    /// an error, not a silent fallback.
    pub fn set_parameterize(&self, f: ParameterizeFn) {
        let mut guard = self
            .parameterize
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = Some(f);
    }

    /// Resolves the filter expressions for `entity`, running the
    /// registered filter functions on the first call and returning the
    /// memoized result afterwards. Functions returning `None` contribute
    /// no expression but the type is still recorded as consulted.
    pub fn resolve_for_type(
        &self,
        filter_context: &FilterContext,
        entity: &EntityType,
    ) -> Result<Arc<TypeFilters>, EngineError> {
        {
            let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(resolved) = state.resolved.get(entity) {
                return Ok(resolved.clone());
            }
        }

        let parameterize = {
            let guard = self
                .parameterize
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            guard.clone().ok_or(EngineError::ParameterizeNotSet)?
        };

        let expressions: Vec<Expr> = self
            .model
            .filter_definitions(entity)
            .iter()
            .filter_map(|f| f(filter_context))
            .map(|expr| parameterize(&expr))
            .collect();

        let resolved = Arc::new(TypeFilters {
            entity: entity.clone(),
            expressions,
        });

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        // A concurrent resolve may have won the race; keep the first.
        if let Some(existing) = state.resolved.get(entity) {
            return Ok(existing.clone());
        }
        state.resolved.insert(entity.clone(), resolved.clone());
        state.order.push(entity.clone());
        Ok(resolved)
    }

    /// True when resolving `entity` yields at least one expression.
    /// Resolves (and memoizes) on demand, so the answer reflects this
    /// execution's filter functions, not whether anyone asked before.
    pub fn has_for_type(
        &self,
        filter_context: &FilterContext,
        entity: &EntityType,
    ) -> Result<bool, EngineError> {
        let resolved = self.resolve_for_type(filter_context, entity)?;
        Ok(!resolved.expressions.is_empty())
    }

    /// Entity types in the order they were first resolved.
    pub fn resolved_types(&self) -> Vec<EntityType> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.order.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::core::value::Value;
    use model::entity::ModelBuilder;
    use model::expr::{captured, eq, parameter, property, value};
    use model::filter::Services;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn identity() -> ParameterizeFn {
        Arc::new(|e: &Expr| e.clone())
    }

    #[test]
    fn test_resolution_requires_parameterize() {
        let model = ModelBuilder::new(Services::default()).build().unwrap();
        let filters = QueryFilters::new(model);
        let ctx = FilterContext::new(Services::default());

        let result = filters.resolve_for_type(&ctx, &EntityType::new("Video"));
        assert!(matches!(result, Err(EngineError::ParameterizeNotSet)));
    }

    #[test]
    fn test_filter_functions_run_once_per_execution() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();

        let mut builder = ModelBuilder::new(Services::default());
        builder
            .entity("Video", "videos", &["id", "client_id"])
            .has_filter(move |_| {
                counted.fetch_add(1, Ordering::SeqCst);
                Some(eq(property("client_id"), captured("client_id", Value::Int(4))))
            });
        let model = builder.build().unwrap();

        let filters = QueryFilters::new(model);
        filters.set_parameterize(identity());
        let ctx = FilterContext::new(Services::default());
        let entity = EntityType::new("Video");

        let first = filters.resolve_for_type(&ctx, &entity).unwrap();
        let second = filters.resolve_for_type(&ctx, &entity).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(filters.resolved_types(), vec![entity.clone()]);
        assert!(filters.has_for_type(&ctx, &entity).unwrap());
    }

    #[test]
    fn test_has_for_type_resolves_on_demand() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();

        let mut builder = ModelBuilder::new(Services::default());
        builder
            .entity("Video", "videos", &["client_id"])
            .has_filter(move |_| {
                counted.fetch_add(1, Ordering::SeqCst);
                Some(eq(property("client_id"), value(Value::Int(2))))
            });
        let model = builder.build().unwrap();

        let filters = QueryFilters::new(model);
        filters.set_parameterize(identity());
        let ctx = FilterContext::new(Services::default());
        let entity = EntityType::new("Video");

        // No prior resolve_for_type call; the check itself resolves.
        assert!(filters.has_for_type(&ctx, &entity).unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(filters.resolved_types(), vec![entity]);
    }

    #[test]
    fn test_resolved_expressions_pass_through_parameterize() {
        let mut builder = ModelBuilder::new(Services::default());
        builder
            .entity("Video", "videos", &["client_id"])
            .has_filter(|_| Some(eq(property("client_id"), captured("client_id", Value::Int(4)))));
        let model = builder.build().unwrap();

        let filters = QueryFilters::new(model);
        filters.set_parameterize(Arc::new(|e: &Expr| {
            e.rewrite(&mut |node| match node {
                Expr::Captured { name, .. } => Some(parameter(&format!("{name}_0"))),
                _ => None,
            })
        }));
        let ctx = FilterContext::new(Services::default());

        let resolved = filters
            .resolve_for_type(&ctx, &EntityType::new("Video"))
            .unwrap();
        assert_eq!(
            resolved.expressions,
            vec![eq(property("client_id"), parameter("client_id_0"))]
        );
    }

    #[test]
    fn test_none_filters_leave_type_consulted_but_empty() {
        let mut builder = ModelBuilder::new(Services::default());
        builder
            .entity("Video", "videos", &["id"])
            .has_filter(|_| None);
        let model = builder.build().unwrap();

        let filters = QueryFilters::new(model);
        filters.set_parameterize(identity());
        let ctx = FilterContext::new(Services::default());
        let entity = EntityType::new("Video");

        let resolved = filters.resolve_for_type(&ctx, &entity).unwrap();
        assert!(resolved.expressions.is_empty());
        assert_eq!(filters.resolved_types(), vec![entity.clone()]);
        assert!(!filters.has_for_type(&ctx, &entity).unwrap());
    }
}
