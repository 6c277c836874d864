//! Entity metadata and the model-build-time filter registry.

use crate::error::ModelError;
use crate::expr::Expr;
use crate::filter::{EntityFilter, FilterContext, FilterFn, Services};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A cheap, cloneable entity type token. Entities are identified by
/// name; all registry lookups key on this.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityType(Arc<str>);

impl EntityType {
    pub fn new(name: &str) -> Self {
        EntityType(Arc::from(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct EntityMeta {
    pub entity: EntityType,
    pub table: String,
    pub columns: Vec<String>,
    pub base: Option<EntityType>,
}

/// The immutable entity model: metadata plus the per-type filter
/// registry. Built once at configuration time via [`ModelBuilder`];
/// query executions only read from it.
pub struct EntityModel {
    entities: HashMap<EntityType, EntityMeta>,
    filters: HashMap<EntityType, Vec<FilterFn>>,
    services: Services,
}

impl EntityModel {
    pub fn entity(&self, entity: &EntityType) -> Option<&EntityMeta> {
        self.entities.get(entity)
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// True when `name` is a column of `entity` or any of its base
    /// types.
    pub fn has_column(&self, entity: &EntityType, name: &str) -> bool {
        for meta in self.inheritance_chain(entity) {
            if meta.columns.iter().any(|c| c == name) {
                return true;
            }
        }
        false
    }

    /// Columns of `entity` including inherited ones, base-type columns
    /// first.
    pub fn all_columns(&self, entity: &EntityType) -> Vec<String> {
        let mut chain: Vec<&EntityMeta> = self.inheritance_chain(entity).collect();
        chain.reverse();
        chain
            .into_iter()
            .flat_map(|meta| meta.columns.iter().cloned())
            .collect()
    }

    /// All filter definitions reachable through the inheritance chain,
    /// base types first, registration order preserved within a type.
    /// No de-duplication: registering twice applies twice.
    pub fn filter_definitions(&self, entity: &EntityType) -> Vec<FilterFn> {
        let mut chain: Vec<&EntityMeta> = self.inheritance_chain(entity).collect();
        chain.reverse();
        chain
            .into_iter()
            .flat_map(|meta| {
                self.filters
                    .get(&meta.entity)
                    .into_iter()
                    .flatten()
                    .cloned()
            })
            .collect()
    }

    /// Walks from `entity` up through its base types. Cycles are
    /// rejected at build time, so the walk terminates.
    fn inheritance_chain<'a>(
        &'a self,
        entity: &EntityType,
    ) -> impl Iterator<Item = &'a EntityMeta> {
        let mut current = self.entities.get(entity);
        std::iter::from_fn(move || {
            let meta = current?;
            current = meta.base.as_ref().and_then(|b| self.entities.get(b));
            Some(meta)
        })
    }
}

/// Configuration-time builder for an [`EntityModel`].
pub struct ModelBuilder {
    services: Services,
    entities: Vec<EntityMeta>,
    filters: HashMap<EntityType, Vec<FilterFn>>,
}

impl ModelBuilder {
    pub fn new(services: Services) -> Self {
        ModelBuilder {
            services,
            entities: Vec::new(),
            filters: HashMap::new(),
        }
    }

    /// Starts configuring an entity type. Columns are the queryable
    /// property names; inherited columns come from the base type.
    pub fn entity(&mut self, name: &str, table: &str, columns: &[&str]) -> EntityBuilder<'_> {
        let entity = EntityType::new(name);
        self.entities.push(EntityMeta {
            entity: entity.clone(),
            table: table.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            base: None,
        });
        let index = self.entities.len() - 1;
        EntityBuilder {
            builder: self,
            entity,
            index,
        }
    }

    pub fn build(self) -> Result<Arc<EntityModel>, ModelError> {
        let mut entities = HashMap::new();
        for meta in self.entities {
            let name = meta.entity.clone();
            if entities.insert(name.clone(), meta).is_some() {
                return Err(ModelError::DuplicateEntity(name.name().to_string()));
            }
        }
        for meta in entities.values() {
            if let Some(base) = &meta.base {
                if !entities.contains_key(base) {
                    return Err(ModelError::UnknownBaseType {
                        entity: meta.entity.name().to_string(),
                        base: base.name().to_string(),
                    });
                }
            }
            // Walk the chain with a step budget to reject cycles.
            let mut steps = 0;
            let mut current = Some(&meta.entity);
            while let Some(ty) = current {
                if steps > entities.len() {
                    return Err(ModelError::InheritanceCycle {
                        entity: meta.entity.name().to_string(),
                    });
                }
                steps += 1;
                current = entities.get(ty).and_then(|m| m.base.as_ref());
            }
        }
        Ok(Arc::new(EntityModel {
            entities,
            filters: self.filters,
            services: self.services,
        }))
    }
}

/// Per-entity configuration surface, chained off `ModelBuilder::entity`.
pub struct EntityBuilder<'a> {
    builder: &'a mut ModelBuilder,
    entity: EntityType,
    index: usize,
}

impl EntityBuilder<'_> {
    fn meta_mut(&mut self) -> &mut EntityMeta {
        &mut self.builder.entities[self.index]
    }

    pub fn has_base_type(mut self, name: &str) -> Self {
        self.meta_mut().base = Some(EntityType::new(name));
        self
    }

    /// Registers a filter function for this entity type. Multiple
    /// registrations accumulate.
    pub fn has_filter(
        self,
        filter: impl Fn(&FilterContext) -> Option<Expr> + Send + Sync + 'static,
    ) -> Self {
        self.builder
            .filters
            .entry(self.entity.clone())
            .or_default()
            .push(Arc::new(filter));
        self
    }

    /// Registers a constant predicate, applied on every execution.
    pub fn has_filter_expr(self, expr: Expr) -> Self {
        self.has_filter(move |_| Some(expr.clone()))
    }

    /// Registers a filter by kind: the instance is resolved from the
    /// configured services now, at build time, and fails fast when it
    /// is not available.
    pub fn has_filter_kind<F: EntityFilter + 'static>(self) -> Result<Self, ModelError> {
        let filter = self
            .builder
            .services
            .get::<F>()
            .ok_or(ModelError::FilterKindUnavailable {
                kind: std::any::type_name::<F>(),
            })?;
        Ok(self.has_filter(move |ctx| filter.predicate(ctx)))
    }
}
