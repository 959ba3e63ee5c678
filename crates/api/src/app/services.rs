//! Backend wiring: one inventory store, one catalog, one image directory.

use mast_core::InventoryId;
use mast_infra::{
    db::{bootstrap_schema, connect_with_retry, PgConnectionProvider},
    BatchOutcome, CatalogStore, DatabaseConfig, ImageStore, InMemoryDatabase, InventoryError,
    InventoryStore, PgCatalogStore, StorageError, StoreConfig,
};
use mast_inventory::BatchUpdateItem;

pub enum AppServices {
    /// Dev/test backend; state lives in process memory.
    InMemory {
        db: InMemoryDatabase,
        inventory: InventoryStore<InMemoryDatabase>,
        images: ImageStore,
    },
    Postgres {
        catalog: PgCatalogStore,
        inventory: InventoryStore<PgConnectionProvider>,
        images: ImageStore,
    },
}

impl AppServices {
    pub fn in_memory(db: InMemoryDatabase, config: StoreConfig, images: ImageStore) -> Self {
        let inventory = InventoryStore::new(db.clone(), config);
        AppServices::InMemory {
            db,
            inventory,
            images,
        }
    }

    /// Connect (with retry) and make sure the schema exists.
    pub async fn postgres(
        db: &DatabaseConfig,
        config: StoreConfig,
        images: ImageStore,
    ) -> Result<Self, StorageError> {
        let pool = connect_with_retry(db).await?;
        bootstrap_schema(&pool).await?;
        tracing::info!("database schema ready");

        Ok(AppServices::Postgres {
            catalog: PgCatalogStore::new(pool.clone()),
            inventory: InventoryStore::new(PgConnectionProvider::new(pool), config),
            images,
        })
    }

    pub fn catalog(&self) -> &dyn CatalogStore {
        match self {
            AppServices::InMemory { db, .. } => db as &dyn CatalogStore,
            AppServices::Postgres { catalog, .. } => catalog,
        }
    }

    pub fn images(&self) -> &ImageStore {
        match self {
            AppServices::InMemory { images, .. } | AppServices::Postgres { images, .. } => images,
        }
    }

    pub async fn update_single(&self, id: InventoryId, quantity: i64) -> Result<u64, InventoryError> {
        match self {
            AppServices::InMemory { inventory, .. } => inventory.update_single(id, quantity).await,
            AppServices::Postgres { inventory, .. } => inventory.update_single(id, quantity).await,
        }
    }

    pub async fn update_batch(
        &self,
        items: &[BatchUpdateItem],
    ) -> Result<BatchOutcome, InventoryError> {
        match self {
            AppServices::InMemory { inventory, .. } => inventory.update_batch(items).await,
            AppServices::Postgres { inventory, .. } => inventory.update_batch(items).await,
        }
    }
}
