use thiserror::Error;

use crate::repository::RepositoryError;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("invalid order: {0}")]
    Invalid(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("failed to encode outbox event: {0}")]
    Encode(#[from] serde_json::Error),
}
