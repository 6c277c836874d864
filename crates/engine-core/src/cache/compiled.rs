//! The compiled-query cache: final key to executable delegate.

use crate::cache::final_key::FinalCacheKey;
use crate::context::QueryContext;
use crate::error::EngineError;
use futures::future::BoxFuture;
use futures::stream::Stream;
use model::core::row::RowData;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

pub type RowStream = Pin<Box<dyn Stream<Item = Result<RowData, EngineError>> + Send>>;

/// A compiled synchronous query, ready to bind parameters from a
/// context and fetch rows.
pub type CompiledQuery =
    Arc<dyn Fn(Arc<QueryContext>) -> Result<Vec<RowData>, EngineError> + Send + Sync>;

/// A compiled asynchronous query producing a row stream.
pub type CompiledAsyncQuery =
    Arc<dyn Fn(Arc<QueryContext>) -> BoxFuture<'static, Result<RowStream, EngineError>> + Send + Sync>;

/// Stores compiled delegates keyed by [`FinalCacheKey`]. The cache owns
/// its locks; callers never coordinate access themselves. Each map lock
/// is held across the factory call, so a given key compiles at most
/// once even under concurrent misses. Factory errors are returned, not
/// cached.
#[derive(Default)]
pub struct CompiledQueryCache {
    queries: Mutex<HashMap<FinalCacheKey, CompiledQuery>>,
    async_queries: Mutex<HashMap<FinalCacheKey, CompiledAsyncQuery>>,
}

impl CompiledQueryCache {
    pub fn new() -> Self {
        CompiledQueryCache::default()
    }

    pub fn get_or_add(
        &self,
        key: FinalCacheKey,
        factory: impl FnOnce() -> Result<CompiledQuery, EngineError>,
    ) -> Result<CompiledQuery, EngineError> {
        let mut queries = self.queries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(compiled) = queries.get(&key) {
            return Ok(compiled.clone());
        }
        let compiled = factory()?;
        queries.insert(key, compiled.clone());
        Ok(compiled)
    }

    pub fn get_or_add_async(
        &self,
        key: FinalCacheKey,
        factory: impl FnOnce() -> Result<CompiledAsyncQuery, EngineError>,
    ) -> Result<CompiledAsyncQuery, EngineError> {
        let mut queries = self
            .async_queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(compiled) = queries.get(&key) {
            return Ok(compiled.clone());
        }
        let compiled = factory()?;
        queries.insert(key, compiled.clone());
        Ok(compiled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::filter_key::FilterSetCacheKeyGenerator;
    use crate::query::{QueryCacheKeyGenerator, QueryModel};
    use model::entity::EntityType;

    fn key(entity: &str) -> FinalCacheKey {
        FinalCacheKey::new(
            QueryCacheKeyGenerator::generate(
                &QueryModel {
                    entity: EntityType::new(entity),
                    predicate: None,
                    limit: None,
                },
                false,
            ),
            FilterSetCacheKeyGenerator::generate(&[]),
        )
    }

    fn noop() -> CompiledQuery {
        Arc::new(|_| Ok(Vec::new()))
    }

    #[test]
    fn test_second_lookup_reuses_the_first_delegate() {
        let cache = CompiledQueryCache::new();
        let mut compiles = 0;

        let first = cache
            .get_or_add(key("Video"), || {
                compiles += 1;
                Ok(noop())
            })
            .unwrap();
        let second = cache
            .get_or_add(key("Video"), || {
                compiles += 1;
                Ok(noop())
            })
            .unwrap();

        assert_eq!(compiles, 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_racing_threads_compile_a_cold_key_once() {
        use std::sync::Barrier;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let cache = CompiledQueryCache::new();
        let compiles = AtomicUsize::new(0);
        let barrier = Barrier::new(8);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    barrier.wait();
                    cache
                        .get_or_add(key("Video"), || {
                            compiles.fetch_add(1, Ordering::SeqCst);
                            Ok(noop())
                        })
                        .unwrap();
                });
            }
        });

        assert_eq!(compiles.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_factory_errors_are_not_cached() {
        let cache = CompiledQueryCache::new();

        let failed = cache.get_or_add(key("Video"), || {
            Err(EngineError::Compilation("boom".into()))
        });
        assert!(failed.is_err());

        let ok = cache.get_or_add(key("Video"), || Ok(noop()));
        assert!(ok.is_ok());
    }
}
