//! Error types for parlor-core

use thiserror::Error;

/// Result type alias using parlor-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in parlor-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Sync requested without a persistent user identity
    #[error("Sync requires a persistent user identity")]
    NotAuthenticated,

    /// Remote store could not be reached
    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// Remote store rejected a query or write
    #[error("Remote rejected: {0}")]
    RemoteRejected(String),
}
