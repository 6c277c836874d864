//! The database boundary: row sources and query compilation against a
//! relational backend.

use crate::apply::QueryFilterApplicator;
use crate::cache::compiled::{CompiledAsyncQuery, CompiledQuery, RowStream};
use crate::context::QueryContext;
use crate::error::EngineError;
use crate::filters::QueryFilters;
use crate::query::QueryModel;
use async_trait::async_trait;
use futures::FutureExt;
use futures::stream;
use model::core::row::RowData;
use model::core::value::Value;
use model::entity::EntityModel;
use planner::ast::expr::{ColumnRef, SqlExpr};
use planner::ast::select::Select;
use planner::dialect::Dialect;
use planner::render::{Render, Renderer, SqlParam};
use std::sync::Arc;
use tracing::debug;

const ROOT_ALIAS: &str = "t0";

/// Fetches rows for rendered SQL. Implementations wrap a driver or, in
/// tests, a canned row set.
#[async_trait]
pub trait RowSource: Send + Sync {
    fn fetch(&self, sql: &str, binds: &[Value]) -> Result<Vec<RowData>, EngineError>;

    async fn fetch_async(&self, sql: &str, binds: &[Value]) -> Result<Vec<RowData>, EngineError>;
}

/// Compiles logical queries into executable delegates.
pub trait Database: Send + Sync {
    fn compile_query(
        &self,
        query: &QueryModel,
        filters: &QueryFilters,
        context: &QueryContext,
    ) -> Result<CompiledQuery, EngineError>;

    fn compile_async_query(
        &self,
        query: &QueryModel,
        filters: &QueryFilters,
        context: &QueryContext,
    ) -> Result<CompiledAsyncQuery, EngineError>;
}

pub struct RelationalDatabase {
    model: Arc<EntityModel>,
    source: Arc<dyn RowSource>,
    dialect: Arc<dyn Dialect>,
}

impl RelationalDatabase {
    pub fn new(model: Arc<EntityModel>, source: Arc<dyn RowSource>, dialect: Arc<dyn Dialect>) -> Self {
        RelationalDatabase {
            model,
            source,
            dialect,
        }
    }

    /// Builds and renders the SELECT for `query`, with the entity's
    /// filters conjoined after the user predicate.
    fn render_query(
        &self,
        query: &QueryModel,
        filters: &QueryFilters,
        context: &QueryContext,
    ) -> Result<(String, Vec<SqlParam>), EngineError> {
        let meta = self
            .model
            .entity(&query.entity)
            .ok_or_else(|| EngineError::UnknownEntity(query.entity.name().to_string()))?;

        let mut select = Select::new(&meta.table, ROOT_ALIAS);
        select.columns = self
            .model
            .all_columns(&query.entity)
            .into_iter()
            .map(|name| {
                SqlExpr::Column(ColumnRef {
                    table: ROOT_ALIAS.to_string(),
                    name,
                })
            })
            .collect();

        let filter_context = context.filter_context();
        let applicator = QueryFilterApplicator::new(&self.model, filters, &filter_context);

        if let Some(predicate) = &query.predicate {
            let condition = applicator
                .translate(&query.entity, ROOT_ALIAS, predicate)?
                .ok_or_else(|| {
                    EngineError::Compilation(format!(
                        "predicate on {} cannot be translated",
                        query.entity
                    ))
                })?;
            select.and_where(condition);
        }
        applicator.apply_to_select(&query.entity, ROOT_ALIAS, &mut select)?;
        select.limit = query.limit;

        let mut renderer = Renderer::new(self.dialect.as_ref());
        select.render(&mut renderer);
        let (sql, params) = renderer.finish();
        debug!(entity = %query.entity, sql = %sql, "compiled query");
        Ok((sql, params))
    }
}

/// Resolves the rendered bind slots against the execution context.
fn bind(params: &[SqlParam], context: &QueryContext) -> Result<Vec<Value>, EngineError> {
    params
        .iter()
        .map(|param| match param {
            SqlParam::Value(value) => Ok(value.clone()),
            SqlParam::Named(name) => context
                .parameter(name)
                .ok_or_else(|| EngineError::MissingParameter(name.clone())),
        })
        .collect()
}

impl Database for RelationalDatabase {
    fn compile_query(
        &self,
        query: &QueryModel,
        filters: &QueryFilters,
        context: &QueryContext,
    ) -> Result<CompiledQuery, EngineError> {
        let (sql, params) = self.render_query(query, filters, context)?;
        let source = self.source.clone();

        Ok(Arc::new(move |ctx: Arc<QueryContext>| {
            let binds = bind(&params, &ctx)?;
            source.fetch(&sql, &binds)
        }))
    }

    fn compile_async_query(
        &self,
        query: &QueryModel,
        filters: &QueryFilters,
        context: &QueryContext,
    ) -> Result<CompiledAsyncQuery, EngineError> {
        let (sql, params) = self.render_query(query, filters, context)?;
        let source = self.source.clone();

        Ok(Arc::new(move |ctx: Arc<QueryContext>| {
            let source = source.clone();
            let sql = sql.clone();
            let params = params.clone();
            async move {
                let binds = bind(&params, &ctx)?;
                let rows = source.fetch_async(&sql, &binds).await?;
                let stream: RowStream = Box::pin(stream::iter(rows.into_iter().map(Ok)));
                Ok(stream)
            }
            .boxed()
        }))
    }
}
