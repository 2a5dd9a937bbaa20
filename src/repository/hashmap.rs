use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::error::RepositoryError;
use super::repository::{Identified, Repository};

/// In-memory repository. Clones share the same storage.
pub struct HashMapRepository<T> {
    storage: Arc<RwLock<HashMap<String, T>>>,
}

impl<T> Clone for HashMapRepository<T> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<T> Default for HashMapRepository<T> {
    fn default() -> Self {
        Self {
            storage: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<T> HashMapRepository<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.storage.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &str) -> bool {
        self.storage
            .read()
            .map(|s| s.contains_key(id))
            .unwrap_or(false)
    }
}

impl<T> Repository<T> for HashMapRepository<T>
where
    T: Identified + Clone + Send + Sync,
{
    fn list(&self) -> Result<Vec<T>, RepositoryError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| RepositoryError::LockPoisoned("read"))?;
        Ok(storage.values().cloned().collect())
    }

    fn get(&self, id: &str) -> Result<T, RepositoryError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| RepositoryError::LockPoisoned("read"))?;
        storage
            .get(id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }

    fn create(&self, item: T) -> Result<(), RepositoryError> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| RepositoryError::LockPoisoned("write"))?;
        if storage.contains_key(item.id()) {
            return Err(RepositoryError::AlreadyExists(item.id().to_string()));
        }
        storage.insert(item.id().to_string(), item);
        Ok(())
    }

    fn update(&self, item: T) -> Result<(), RepositoryError> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| RepositoryError::LockPoisoned("write"))?;
        match storage.get_mut(item.id()) {
            Some(existing) => {
                *existing = item;
                Ok(())
            }
            None => Err(RepositoryError::NotFound(item.id().to_string())),
        }
    }

    fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| RepositoryError::LockPoisoned("write"))?;
        storage
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }
}
