//! The composite key for the compiled-query cache.

use crate::cache::filter_key::FilterSetCacheKey;
use crate::query::QueryCacheKey;

/// Pairs the query-shape key with the filter-set key. Equality compares
/// both components by content; matching hashes alone never make two
/// keys equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FinalCacheKey {
    query: QueryCacheKey,
    filters: FilterSetCacheKey,
}

impl FinalCacheKey {
    pub fn new(query: QueryCacheKey, filters: FilterSetCacheKey) -> Self {
        FinalCacheKey { query, filters }
    }

    pub fn query(&self) -> &QueryCacheKey {
        &self.query
    }

    pub fn filters(&self) -> &FilterSetCacheKey {
        &self.filters
    }
}
