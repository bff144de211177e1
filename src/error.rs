//! # Query Compilation Errors
//!
//! Every failure the compiler can report. All of them are local validation
//! failures found while walking the input; none are transient, so callers
//! should surface them rather than retry.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    /// Required structural input is missing or contradictory.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A predicate node could not be interpreted.
    #[error("Malformed predicate: {0}")]
    MalformedPredicate(String),

    /// A compiled fragment reduced to nothing.
    #[error("Empty clause: {0}")]
    EmptyClause(String),

    /// A join entry is neither a descriptor nor a permitted raw string.
    #[error("Unsupported join shape: {0}")]
    UnsupportedShape(String),

    #[error("Unresolved join: {join} (postponed {postponements} times)")]
    UnresolvedJoin { join: String, postponements: usize },

    #[error("Parameter %{index} cannot be bound as {type_hint}: {message}")]
    ParameterType {
        index: usize,
        type_hint: String,
        message: String,
    },

    #[error("Failed to load configuration: {0}")]
    ConfigLoad(#[from] ::config::ConfigError),
}

pub type Result<T> = std::result::Result<T, QueryError>;
