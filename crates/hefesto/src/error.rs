//! Error types for hefesto.

use miette::Diagnostic;
use thiserror::Error;

use crate::value::ValueType;

/// Error type shared by the clause model, both translators and the projector.
#[derive(Error, Diagnostic, Debug)]
pub enum HefestoError {
    #[error("Query construction failed: {0}")]
    #[diagnostic(
        code(hefesto::query),
        help("Check the clauses added to the builder before the terminal call")
    )]
    Query(String),

    #[error("Unsupported operation: {0}")]
    #[diagnostic(
        code(hefesto::unsupported_operation),
        help("The operator is not valid for this kind of clause")
    )]
    UnsupportedOperation(String),

    #[error("Invalid argument: {0}")]
    #[diagnostic(code(hefesto::invalid_argument))]
    InvalidArgument(String),

    #[error("Cannot cast '{value}' to {target}")]
    #[diagnostic(
        code(hefesto::coercion),
        help("The value must be parseable as the type of the compared field")
    )]
    Coercion { value: String, target: ValueType },

    #[error("Unsupported casting type: {0}")]
    #[diagnostic(code(hefesto::unsupported_cast))]
    UnsupportedCast(String),

    #[error("Projection failed: {0}")]
    #[diagnostic(
        code(hefesto::projection),
        help("Register a constructor or a setter for every selected alias")
    )]
    Projection(String),

    #[error("Query execution failed: {0}")]
    #[diagnostic(code(hefesto::execution))]
    Execution(String),

    #[error("Session error: {0}")]
    #[diagnostic(code(hefesto::session))]
    Session(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("TOML serialization error: {0}")]
    #[diagnostic(
        code(hefesto::toml_serialize),
        help("Check your configuration structure for invalid values")
    )]
    TomlSerError(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    #[diagnostic(
        code(hefesto::toml_deserialize),
        help("Check your hefesto.toml syntax and structure")
    )]
    TomlDeError(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    #[diagnostic(code(hefesto::io), help("Check file permissions and path"))]
    IoError(#[from] std::io::Error),

    #[error("Logging setup failed: {0}")]
    #[diagnostic(code(hefesto::logging))]
    Logging(String),
}

impl HefestoError {
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedOperation(msg.into())
    }
}

/// Result type alias for hefesto operations.
pub type Result<T> = std::result::Result<T, HefestoError>;
