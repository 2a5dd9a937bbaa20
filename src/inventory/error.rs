use thiserror::Error;

use crate::repository::RepositoryError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InventoryError {
    #[error("product {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl InventoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, InventoryError::NotFound(_))
    }
}

impl From<RepositoryError> for InventoryError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => InventoryError::NotFound(id),
            other => InventoryError::Repository(other),
        }
    }
}
