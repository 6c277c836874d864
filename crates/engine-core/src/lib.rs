pub mod apply;
pub mod cache;
pub mod compiler;
pub mod context;
pub mod database;
pub mod error;
pub mod filters;
pub mod parameterize;
pub mod query;

pub use compiler::QueryCompiler;
pub use context::{QueryContext, QueryContextFactory};
pub use database::{Database, RelationalDatabase, RowSource};
pub use error::EngineError;
pub use query::QueryModel;
