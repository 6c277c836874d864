pub mod expr;
pub mod select;
