//! The logical query shape and its structural cache key.

use model::entity::EntityType;
use model::expr::Expr;
use std::hash::{Hash, Hasher};
use xxhash_rust::xxh3::Xxh3;

/// A logical single-entity query: which entity, an optional predicate,
/// an optional row limit. Predicates here are expected to be already
/// parameterized, so two executions differing only in captured values
/// share a shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryModel {
    pub entity: EntityType,
    pub predicate: Option<Expr>,
    pub limit: Option<u64>,
}

/// Structural cache key for a query shape. The hash is precomputed once;
/// equality always compares the full content, never just the hash.
#[derive(Debug, Clone)]
pub struct QueryCacheKey {
    model: QueryModel,
    is_async: bool,
    hash: u64,
}

impl QueryCacheKey {
    pub fn model(&self) -> &QueryModel {
        &self.model
    }

    pub fn is_async(&self) -> bool {
        self.is_async
    }
}

impl PartialEq for QueryCacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.is_async == other.is_async && self.model == other.model
    }
}

impl Eq for QueryCacheKey {}

impl Hash for QueryCacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

pub struct QueryCacheKeyGenerator;

impl QueryCacheKeyGenerator {
    pub fn generate(model: &QueryModel, is_async: bool) -> QueryCacheKey {
        let mut hasher = Xxh3::new();
        model.hash(&mut hasher);
        is_async.hash(&mut hasher);
        let hash = hasher.finish();
        QueryCacheKey {
            model: model.clone(),
            is_async,
            hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::core::value::Value;
    use model::expr::{eq, parameter, property, value};

    fn shape(predicate: Expr) -> QueryModel {
        QueryModel {
            entity: EntityType::new("Video"),
            predicate: Some(predicate),
            limit: None,
        }
    }

    #[test]
    fn test_equal_shapes_produce_equal_keys() {
        let a = QueryCacheKeyGenerator::generate(
            &shape(eq(property("client_id"), parameter("client_id_0"))),
            false,
        );
        let b = QueryCacheKeyGenerator::generate(
            &shape(eq(property("client_id"), parameter("client_id_0"))),
            false,
        );

        assert_eq!(a, b);
    }

    #[test]
    fn test_literal_content_changes_the_key() {
        let a = QueryCacheKeyGenerator::generate(
            &shape(eq(property("client_id"), value(Value::Int(100)))),
            false,
        );
        let b = QueryCacheKeyGenerator::generate(
            &shape(eq(property("client_id"), value(Value::Int(200)))),
            false,
        );

        assert_ne!(a, b);
    }

    #[test]
    fn test_sync_and_async_keys_differ() {
        let model = shape(eq(property("id"), parameter("id_0")));
        let sync = QueryCacheKeyGenerator::generate(&model, false);
        let asynchronous = QueryCacheKeyGenerator::generate(&model, true);

        assert_ne!(sync, asynchronous);
    }
}
