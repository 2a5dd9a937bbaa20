use super::error::RepositoryError;

/// Entities addressed by a string id.
pub trait Identified {
    fn id(&self) -> &str;
}

/// Key-value CRUD over one entity type.
pub trait Repository<T>: Send + Sync {
    fn list(&self) -> Result<Vec<T>, RepositoryError>;

    /// Fails with [`RepositoryError::NotFound`] for an unknown id.
    fn get(&self, id: &str) -> Result<T, RepositoryError>;

    /// Fails with [`RepositoryError::AlreadyExists`] if the id is taken.
    fn create(&self, item: T) -> Result<(), RepositoryError>;

    fn update(&self, item: T) -> Result<(), RepositoryError>;

    fn delete(&self, id: &str) -> Result<(), RepositoryError>;
}
