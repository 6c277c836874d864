//! Structural cache key over a resolved filter set.

use crate::filters::TypeFilters;
use model::expr::Expr;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Key over the flattened filter expressions of one execution, in
/// resolution order. Equality is pairwise structural comparison of the
/// expressions; the hash is an order-sensitive fold, so reordered
/// filters produce a different key.
#[derive(Debug, Clone)]
pub struct FilterSetCacheKey {
    expressions: Vec<Expr>,
    hash: u64,
}

impl FilterSetCacheKey {
    pub fn len(&self) -> usize {
        self.expressions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }
}

impl PartialEq for FilterSetCacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.expressions.len() == other.expressions.len()
            && self
                .expressions
                .iter()
                .zip(&other.expressions)
                .all(|(a, b)| a == b)
    }
}

impl Eq for FilterSetCacheKey {}

impl Hash for FilterSetCacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

pub struct FilterSetCacheKeyGenerator;

impl FilterSetCacheKeyGenerator {
    pub fn generate(sets: &[Arc<TypeFilters>]) -> FilterSetCacheKey {
        let expressions: Vec<Expr> = sets
            .iter()
            .flat_map(|tf| tf.expressions.iter().cloned())
            .collect();

        let mut hash = u64::MAX;
        hash = hash.wrapping_mul(397) ^ (expressions.len() as u64);
        for expr in &expressions {
            hash = hash.wrapping_mul(397) ^ expr.structural_hash();
        }

        FilterSetCacheKey { expressions, hash }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::core::value::Value;
    use model::entity::EntityType;
    use model::expr::{eq, gt, property, value};

    fn set(entity: &str, expressions: Vec<Expr>) -> Arc<TypeFilters> {
        Arc::new(TypeFilters {
            entity: EntityType::new(entity),
            expressions,
        })
    }

    #[test]
    fn test_equal_filter_sets_produce_equal_keys() {
        let a = FilterSetCacheKeyGenerator::generate(&[set(
            "Video",
            vec![eq(property("client_id"), value(Value::Int(2)))],
        )]);
        let b = FilterSetCacheKeyGenerator::generate(&[set(
            "Video",
            vec![eq(property("client_id"), value(Value::Int(2)))],
        )]);

        assert_eq!(a, b);
        let mut ha = std::hash::DefaultHasher::new();
        let mut hb = std::hash::DefaultHasher::new();
        a.hash(&mut ha);
        b.hash(&mut hb);
        assert_eq!(ha.finish(), hb.finish());
    }

    #[test]
    fn test_content_change_changes_the_key() {
        let a = FilterSetCacheKeyGenerator::generate(&[set(
            "Video",
            vec![eq(property("client_id"), value(Value::Int(100)))],
        )]);
        let b = FilterSetCacheKeyGenerator::generate(&[set(
            "Video",
            vec![eq(property("client_id"), value(Value::Int(200)))],
        )]);

        assert_ne!(a, b);
    }

    #[test]
    fn test_order_matters() {
        let first = eq(property("client_id"), value(Value::Int(2)));
        let second = gt(property("id"), value(Value::Int(0)));

        let a = FilterSetCacheKeyGenerator::generate(&[set(
            "Video",
            vec![first.clone(), second.clone()],
        )]);
        let b = FilterSetCacheKeyGenerator::generate(&[set("Video", vec![second, first])]);

        assert_ne!(a, b);
    }

    #[test]
    fn test_empty_sets_flatten_away() {
        let a = FilterSetCacheKeyGenerator::generate(&[
            set("Resource", vec![]),
            set("Video", vec![gt(property("id"), value(Value::Int(0)))]),
        ]);
        let b = FilterSetCacheKeyGenerator::generate(&[set(
            "Video",
            vec![gt(property("id"), value(Value::Int(0)))],
        )]);

        assert_eq!(a, b);
        assert_eq!(a.len(), 1);
    }
}
