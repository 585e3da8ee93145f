use thiserror::Error;

/// Core error type shared across entigen crates.
#[derive(Debug, Error)]
pub enum Error {
    /// An entity or field declaration cannot be used as given.
    #[error("invalid declaration: {0}")]
    InvalidDeclaration(String),
    /// A lookup named an entity that is not registered.
    #[error("unknown entity: {0}")]
    UnknownEntity(String),
    /// Serialization of a declaration failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for results returned by entigen crates.
pub type Result<T> = std::result::Result<T, Error>;
