//! Filter functions and the capability bag they resolve against.

use crate::expr::Expr;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// A registered entity filter: evaluated with a fresh [`FilterContext`]
/// at each resolution, it returns the predicate to conjoin onto queries
/// against its entity type, or `None` for "no restriction this time".
///
/// Filter functions must be pure and side-effect free; a panicking
/// filter aborts the query execution it was resolved for.
pub type FilterFn = Arc<dyn Fn(&FilterContext) -> Option<Expr> + Send + Sync>;

/// A reusable filter implementation, registered by type through
/// `EntityBuilder::has_filter_kind` and resolved from [`Services`] at
/// model-build time.
pub trait EntityFilter: Send + Sync {
    fn predicate(&self, context: &FilterContext) -> Option<Expr>;
}

/// A type-keyed bag of shared services (current user, tenant info,
/// ...) that filters consult at resolution time. Built once during
/// configuration; immutable and cheap to clone afterwards.
#[derive(Clone, Default)]
pub struct Services {
    entries: Arc<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl Services {
    pub fn builder() -> ServicesBuilder {
        ServicesBuilder {
            entries: HashMap::new(),
        }
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.entries
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|entry| entry.downcast::<T>().ok())
    }
}

pub struct ServicesBuilder {
    entries: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl ServicesBuilder {
    /// Registers a service instance, replacing any previous one of the
    /// same type.
    pub fn provide<T: Send + Sync + 'static>(mut self, service: T) -> Self {
        self.entries.insert(TypeId::of::<T>(), Arc::new(service));
        self
    }

    pub fn build(self) -> Services {
        Services {
            entries: Arc::new(self.entries),
        }
    }
}

/// The context handed to a filter function. Created fresh for every
/// resolution call so filters observe current ambient state, never
/// state captured at registration time.
pub struct FilterContext {
    services: Services,
}

impl FilterContext {
    pub fn new(services: Services) -> Self {
        FilterContext { services }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.services.get::<T>()
    }
}
