use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
