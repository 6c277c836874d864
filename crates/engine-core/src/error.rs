use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Parameterization mode has not been set on the filter resolver")]
    ParameterizeNotSet,

    #[error("Unknown entity type: {0}")]
    UnknownEntity(String),

    #[error("Missing query parameter: {0}")]
    MissingParameter(String),

    #[error("Failed to compile query: {0}")]
    Compilation(String),

    #[error("Failed to execute query: {0}")]
    Execution(String),

    #[error("Query returned no rows")]
    NoRows,

    #[error("Query execution was canceled")]
    Canceled,
}
