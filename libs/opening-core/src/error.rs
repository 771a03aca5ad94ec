//! Error types for opening-core.

use thiserror::Error;

/// Result type alias using CoreError.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors surfaced by the study-analytics components.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("grade must be between 0 and 5, got {0}")]
    InvalidGrade(i32),

    #[error("opening has no move tokens")]
    EmptyTarget,

    #[error("evaluation oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("illegal move token '{token}' at ply {ply}")]
    IllegalToken { token: String, ply: usize },
}
