mod error;
mod hashmap;
#[allow(clippy::module_inception)]
mod repository;

pub use error::RepositoryError;
pub use hashmap::HashMapRepository;
pub use repository::{Identified, Repository};
