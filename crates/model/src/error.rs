use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Entity type '{0}' is already registered")]
    DuplicateEntity(String),

    #[error("Entity type '{entity}' declares unknown base type '{base}'")]
    UnknownBaseType { entity: String, base: String },

    #[error("Entity type '{entity}' participates in an inheritance cycle")]
    InheritanceCycle { entity: String },

    #[error("Filter kind '{kind}' is not available from the configured services")]
    FilterKindUnavailable { kind: &'static str },
}
