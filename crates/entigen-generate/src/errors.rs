use thiserror::Error;

use crate::model::GenerationReport;

/// Errors emitted by the generation engine.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("unknown generator '{0}'")]
    UnknownGenerator(String),
    #[error("invalid options: {0}")]
    InvalidOptions(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("generation failed with {} error(s)", .0.errors.len())]
    Failed(GenerationReport),
}
