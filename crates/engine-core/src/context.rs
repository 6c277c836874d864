//! Per-execution query context: captured parameter values and
//! cancellation.

use model::core::value::Value;
use model::filter::{FilterContext, Services};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;

/// Execution-scoped state for a single query run. Captured predicate
/// values are recorded here while the query shape is parameterized, and
/// read back when the compiled delegate binds its placeholders.
pub struct QueryContext {
    services: Services,
    cancellation: CancellationToken,
    state: Mutex<ContextState>,
}

#[derive(Default)]
struct ContextState {
    parameters: HashMap<String, Value>,
    captures: usize,
}

impl QueryContext {
    pub fn new(services: Services) -> Self {
        QueryContext {
            services,
            cancellation: CancellationToken::new(),
            state: Mutex::new(ContextState::default()),
        }
    }

    pub fn with_cancellation(services: Services, cancellation: CancellationToken) -> Self {
        QueryContext {
            services,
            cancellation,
            state: Mutex::new(ContextState::default()),
        }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn filter_context(&self) -> FilterContext {
        FilterContext::new(self.services.clone())
    }

    /// Records a captured value under a deterministic slot name. Slots
    /// are numbered in extraction order, so executions of the same query
    /// shape produce the same names.
    pub fn record_capture(&self, name: &str, value: Value) -> String {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = format!("{}_{}", name, state.captures);
        state.captures += 1;
        state.parameters.insert(slot.clone(), value);
        slot
    }

    pub fn parameter(&self, name: &str) -> Option<Value> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.parameters.get(name).cloned()
    }
}

/// Creates execution contexts sharing one service bag.
#[derive(Clone)]
pub struct QueryContextFactory {
    services: Services,
}

impl QueryContextFactory {
    pub fn new(services: Services) -> Self {
        QueryContextFactory { services }
    }

    pub fn create(&self) -> Arc<QueryContext> {
        Arc::new(QueryContext::new(self.services.clone()))
    }

    pub fn create_with_cancellation(&self, cancellation: CancellationToken) -> Arc<QueryContext> {
        Arc::new(QueryContext::with_cancellation(
            self.services.clone(),
            cancellation,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_slots_are_numbered_in_order() {
        let ctx = QueryContext::new(Services::default());
        let a = ctx.record_capture("client_id", Value::Int(1));
        let b = ctx.record_capture("client_id", Value::Int(2));

        assert_eq!(a, "client_id_0");
        assert_eq!(b, "client_id_1");
        assert_eq!(ctx.parameter("client_id_0"), Some(Value::Int(1)));
        assert_eq!(ctx.parameter("client_id_1"), Some(Value::Int(2)));
        assert_eq!(ctx.parameter("client_id_2"), None);
    }
}
