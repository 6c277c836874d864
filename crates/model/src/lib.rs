pub mod core;
pub mod entity;
pub mod error;
pub mod expr;
pub mod filter;

pub use entity::{EntityMeta, EntityModel, EntityType, ModelBuilder};
pub use error::ModelError;
pub use filter::{EntityFilter, FilterContext, FilterFn, Services};
