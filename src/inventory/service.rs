use tracing::debug;

use crate::repository::{HashMapRepository, Repository};
use crate::trace::Tracer;

use super::error::InventoryError;
use super::product::Product;

/// Product catalogue operations, each wrapped in a span.
#[derive(Clone)]
pub struct InventoryService {
    repo: HashMapRepository<Product>,
    tracer: Tracer,
}

impl InventoryService {
    pub fn new(repo: HashMapRepository<Product>, tracer: Tracer) -> Self {
        Self { repo, tracer }
    }

    pub fn repository(&self) -> &HashMapRepository<Product> {
        &self.repo
    }

    pub fn create(&self, product: Product) -> Result<(), InventoryError> {
        let span = self.tracer.start("inventory.service.create");
        let _guard = span.enter();
        Ok(self.repo.create(product)?)
    }

    pub fn get(&self, id: &str) -> Result<Product, InventoryError> {
        let span = self.tracer.start("inventory.service.get");
        let _guard = span.enter();
        Ok(self.repo.get(id)?)
    }

    pub fn update(&self, product: Product) -> Result<(), InventoryError> {
        let span = self.tracer.start("inventory.service.update");
        let _guard = span.enter();
        Ok(self.repo.update(product)?)
    }

    pub fn delete(&self, id: &str) -> Result<(), InventoryError> {
        let span = self.tracer.start("inventory.service.delete");
        let _guard = span.enter();
        self.repo.delete(id)?;
        debug!(product_id = %id, "product deleted");
        Ok(())
    }

    pub fn list(&self) -> Result<Vec<Product>, InventoryError> {
        let span = self.tracer.start("inventory.service.list");
        let _guard = span.enter();
        Ok(self.repo.list()?)
    }
}
