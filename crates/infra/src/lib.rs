//! Infrastructure layer: connection providers, stores, configuration.

pub mod catalog;
pub mod config;
pub mod db;
pub mod images;
pub mod inventory_store;

pub use catalog::{CatalogError, CatalogStore, PgCatalogStore};
pub use config::{DatabaseConfig, ServerConfig, StoreConfig};
pub use db::{ConnectionProvider, InMemoryDatabase, InventoryConnection, StorageError, TxState};
pub use images::{ImageStore, ImageStoreError};
pub use inventory_store::{BatchOutcome, InventoryError, InventoryStore};

mod integration_tests;
