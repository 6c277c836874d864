//! Orchestrates query execution: parameter extraction, filter
//! resolution, the two-level compiled-query cache, and the execution
//! entry points.

use crate::cache::compiled::{CompiledAsyncQuery, CompiledQuery, CompiledQueryCache, RowStream};
use crate::cache::filter_key::FilterSetCacheKeyGenerator;
use crate::cache::final_key::FinalCacheKey;
use crate::cache::types::FilterTypesCache;
use crate::context::{QueryContext, QueryContextFactory};
use crate::database::Database;
use crate::error::EngineError;
use crate::filters::QueryFilters;
use crate::parameterize::extract_parameters;
use crate::query::{QueryCacheKey, QueryCacheKeyGenerator, QueryModel};
use futures::StreamExt;
use model::core::row::RowData;
use model::entity::EntityModel;
use std::sync::Arc;
use tracing::error;

pub struct QueryCompiler {
    model: Arc<EntityModel>,
    database: Arc<dyn Database>,
    types_cache: FilterTypesCache,
    compiled_cache: CompiledQueryCache,
    context_factory: QueryContextFactory,
}

impl QueryCompiler {
    pub fn new(model: Arc<EntityModel>, database: Arc<dyn Database>) -> Self {
        let context_factory = QueryContextFactory::new(model.services().clone());
        QueryCompiler {
            model,
            database,
            types_cache: FilterTypesCache::new(),
            compiled_cache: CompiledQueryCache::new(),
            context_factory,
        }
    }

    pub fn context_factory(&self) -> &QueryContextFactory {
        &self.context_factory
    }

    pub fn execute(
        &self,
        query: &QueryModel,
        context: Arc<QueryContext>,
    ) -> Result<Vec<RowData>, EngineError> {
        let compiled = self.get_or_compile(query, &context, true)?;
        compiled(context)
    }

    pub async fn execute_stream(
        &self,
        query: &QueryModel,
        context: Arc<QueryContext>,
    ) -> Result<RowStream, EngineError> {
        let compiled = self.get_or_compile_async(query, &context, true)?;
        compiled(context).await
    }

    /// Fetches the first row of the query, racing the context's
    /// cancellation token. Failures are logged and rethrown; an empty
    /// result is an error.
    pub async fn execute_single(
        &self,
        query: &QueryModel,
        context: Arc<QueryContext>,
    ) -> Result<RowData, EngineError> {
        let token = context.cancellation().clone();
        let compiled = self.get_or_compile_async(query, &context, true)?;

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => Err(EngineError::Canceled),
            row = async {
                let mut stream = compiled(context).await?;
                stream.next().await.unwrap_or(Err(EngineError::NoRows))
            } => row,
        };

        match result {
            Ok(row) => Ok(row),
            Err(err) => {
                error!(entity = %query.entity, error = %err, "single-row query failed");
                Err(err)
            }
        }
    }

    /// Precompiles a query for repeated execution. Captured values are
    /// inlined rather than parameterized, so the delegate is pinned to
    /// the exact predicate content it was built with.
    pub fn create_compiled_query(&self, query: &QueryModel) -> Result<CompiledQuery, EngineError> {
        let context = self.context_factory.create();
        self.get_or_compile(query, &context, false)
    }

    pub fn create_compiled_stream(
        &self,
        query: &QueryModel,
    ) -> Result<CompiledAsyncQuery, EngineError> {
        let context = self.context_factory.create();
        self.get_or_compile_async(query, &context, false)
    }

    fn get_or_compile(
        &self,
        query: &QueryModel,
        context: &Arc<QueryContext>,
        parameterize: bool,
    ) -> Result<CompiledQuery, EngineError> {
        let (model, filters, key) = self.prepare(query, context, parameterize, false);

        let mut eager = None;
        if !self.types_cache.is_cached(&key) {
            eager = Some(self.database.compile_query(&model, &filters, context)?);
            self.record_types(&key, &filters);
        }

        let final_key = self.final_key(key, &filters, context)?;
        self.compiled_cache.get_or_add(final_key, move || match eager {
            Some(compiled) => Ok(compiled),
            None => self.database.compile_query(&model, &filters, context),
        })
    }

    fn get_or_compile_async(
        &self,
        query: &QueryModel,
        context: &Arc<QueryContext>,
        parameterize: bool,
    ) -> Result<CompiledAsyncQuery, EngineError> {
        let (model, filters, key) = self.prepare(query, context, parameterize, true);

        let mut eager = None;
        if !self.types_cache.is_cached(&key) {
            eager = Some(self.database.compile_async_query(&model, &filters, context)?);
            self.record_types(&key, &filters);
        }

        let final_key = self.final_key(key, &filters, context)?;
        self.compiled_cache
            .get_or_add_async(final_key, move || match eager {
                Some(compiled) => Ok(compiled),
                None => self.database.compile_async_query(&model, &filters, context),
            })
    }

    /// Lifts captured values out of the query predicate and sets up the
    /// execution-scoped filter resolver with the same extraction mode.
    fn prepare(
        &self,
        query: &QueryModel,
        context: &Arc<QueryContext>,
        parameterize: bool,
        is_async: bool,
    ) -> (QueryModel, Arc<QueryFilters>, QueryCacheKey) {
        let model = QueryModel {
            entity: query.entity.clone(),
            predicate: query
                .predicate
                .as_ref()
                .map(|p| extract_parameters(p, context, parameterize)),
            limit: query.limit,
        };

        let filters = Arc::new(QueryFilters::new(self.model.clone()));
        let ctx = context.clone();
        filters.set_parameterize(Arc::new(move |expr| {
            extract_parameters(expr, &ctx, parameterize)
        }));

        let key = QueryCacheKeyGenerator::generate(&model, is_async);
        (model, filters, key)
    }

    /// Records every type consulted during the compilation, including
    /// types whose filters yielded nothing this run: a later execution
    /// where such a filter produces an expression must still see a
    /// different final key. The shape is marked as seen either way.
    fn record_types(&self, key: &QueryCacheKey, filters: &QueryFilters) {
        for entity in filters.resolved_types() {
            self.types_cache.add_type(key, entity);
        }
        self.types_cache.get_types(key);
    }

    /// Gathers the filter expressions for every type recorded against
    /// the shape and combines both keys.
    fn final_key(
        &self,
        key: QueryCacheKey,
        filters: &QueryFilters,
        context: &QueryContext,
    ) -> Result<FinalCacheKey, EngineError> {
        let filter_context = context.filter_context();
        let mut sets = Vec::new();
        for entity in self.types_cache.get_types(&key) {
            sets.push(filters.resolve_for_type(&filter_context, &entity)?);
        }
        let filter_key = FilterSetCacheKeyGenerator::generate(&sets);
        Ok(FinalCacheKey::new(key, filter_key))
    }
}
