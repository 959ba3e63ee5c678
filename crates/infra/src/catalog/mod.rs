//! Catalog boundary: categories and parts.
//!
//! These are plain queries without cross-row invariants, apart from part
//! creation, which inserts the part and its stock row in one transaction.

use async_trait::async_trait;
use thiserror::Error;

use mast_core::{CategoryId, PartId};
use mast_inventory::{Category, NewPart, Part, PartFilter};

use crate::db::StorageError;

pub mod in_memory;
pub mod postgres;

pub use postgres::PgCatalogStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("category {0} not found")]
    CategoryNotFound(CategoryId),

    #[error("database unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for CatalogError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Unavailable(msg) => CatalogError::Unavailable(msg),
            other => CatalogError::Storage(other),
        }
    }
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// All categories, ordered by id.
    async fn list_categories(&self) -> Result<Vec<Category>, CatalogError>;

    /// Parts matching `filter`, ordered by id.
    async fn list_parts(&self, filter: &PartFilter) -> Result<Vec<Part>, CatalogError>;

    async fn get_part(&self, id: PartId) -> Result<Option<Part>, CatalogError>;

    /// Insert the part and its stock row atomically.
    async fn create_part(&self, new_part: &NewPart) -> Result<Part, CatalogError>;

    /// Rows affected (0 when the part does not exist). Cascades to stock.
    async fn delete_part(&self, id: PartId) -> Result<u64, CatalogError>;

    /// Rows affected (0 when the part does not exist).
    async fn set_image_url(&self, id: PartId, url: &str) -> Result<u64, CatalogError>;
}
