//! Database error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Core(#[from] opening_core::CoreError),

    #[error("opening not found: {0}")]
    OpeningNotFound(i64),

    #[error("invalid stored data: {0}")]
    InvalidData(String),
}
