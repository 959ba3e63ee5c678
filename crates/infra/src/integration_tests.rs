//! Integration tests against a real Postgres.
//!
//! Tests: InventoryStore → PgConnectionProvider → inventory table, and the
//! catalog queries that create and delete stock rows.
//!
//! Ignored by default; run with `DATABASE_URL=postgres://... cargo test -- --ignored`.

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    use sqlx::PgPool;

    use mast_core::{CategoryId, InventoryId};
    use mast_inventory::{BatchUpdateItem, NewPart, Part, PartFilter, Quantity};

    use crate::catalog::{CatalogError, CatalogStore, PgCatalogStore};
    use crate::config::{DatabaseConfig, StoreConfig};
    use crate::db::{bootstrap_schema, connect_with_retry, PgConnectionProvider};
    use crate::inventory_store::{InventoryError, InventoryStore};

    async fn setup() -> (PgPool, PgCatalogStore, CategoryId) {
        let mut config = DatabaseConfig::from_env().expect("DATABASE_URL must be set");
        config.connect_retries = 1;
        let pool = connect_with_retry(&config).await.unwrap();
        bootstrap_schema(&pool).await.unwrap();

        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let (category_id,): (i64,) =
            sqlx::query_as("INSERT INTO category (name) VALUES ($1) RETURNING id")
                .bind(format!("it-{}-{nanos}", std::process::id()))
                .fetch_one(&pool)
                .await
                .unwrap();

        let catalog = PgCatalogStore::new(pool.clone());
        (pool, catalog, CategoryId::new(category_id))
    }

    async fn part(catalog: &PgCatalogStore, category: CategoryId, quantity: i64) -> Part {
        catalog
            .create_part(&NewPart::new("Integration bolt", category, quantity).unwrap())
            .await
            .unwrap()
    }

    async fn stored_quantity(pool: &PgPool, id: InventoryId) -> Option<i64> {
        sqlx::query_as::<_, (i64,)>("SELECT quantity FROM inventory WHERE id = $1")
            .bind(id.get())
            .fetch_optional(pool)
            .await
            .unwrap()
            .map(|(q,)| q)
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn single_and_batch_updates_round_trip_through_postgres() {
        let (pool, catalog, category) = setup().await;
        let a = part(&catalog, category, 5).await;
        let b = part(&catalog, category, 7).await;
        let store = InventoryStore::new(PgConnectionProvider::new(pool.clone()), StoreConfig::default());

        assert_eq!(store.update_single(a.inventory_id, 50).await.unwrap(), 1);
        assert_eq!(stored_quantity(&pool, a.inventory_id).await, Some(50));

        store
            .update_batch(&[
                BatchUpdateItem::new(a.inventory_id, 10),
                BatchUpdateItem::new(b.inventory_id, 20),
            ])
            .await
            .unwrap();
        assert_eq!(stored_quantity(&pool, a.inventory_id).await, Some(10));
        assert_eq!(stored_quantity(&pool, b.inventory_id).await, Some(20));
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn rejected_batch_leaves_postgres_untouched() {
        let (pool, catalog, category) = setup().await;
        let a = part(&catalog, category, 5).await;
        let b = part(&catalog, category, 7).await;
        let store = InventoryStore::new(PgConnectionProvider::new(pool.clone()), StoreConfig::default());

        let err = store
            .update_batch(&[
                BatchUpdateItem::new(a.inventory_id, 10),
                BatchUpdateItem::new(b.inventory_id, -1),
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, InventoryError::Validation { item_id, .. } if item_id == b.inventory_id));
        assert_eq!(stored_quantity(&pool, a.inventory_id).await, Some(5));
        assert_eq!(stored_quantity(&pool, b.inventory_id).await, Some(7));
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn cancelled_batch_does_not_leak_an_open_transaction() {
        let (pool, catalog, category) = setup().await;
        let a = part(&catalog, category, 5).await;
        let store = InventoryStore::new(PgConnectionProvider::new(pool.clone()), StoreConfig::default());

        // Hold a row lock from another connection so the batch blocks mid-way.
        let mut blocker = pool.begin().await.unwrap();
        sqlx::query("SELECT id FROM inventory WHERE id = $1 FOR UPDATE")
            .bind(a.inventory_id.get())
            .execute(&mut *blocker)
            .await
            .unwrap();

        let batch = [BatchUpdateItem::new(a.inventory_id, 99)];
        let abandoned = tokio::time::timeout(Duration::from_millis(200), store.update_batch(&batch)).await;
        assert!(abandoned.is_err());
        blocker.rollback().await.unwrap();

        assert_eq!(stored_quantity(&pool, a.inventory_id).await, Some(5));
        assert_eq!(store.update_single(a.inventory_id, 6).await.unwrap(), 1);
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn catalog_create_filter_and_cascade_delete() {
        let (pool, catalog, category) = setup().await;
        let created = part(&catalog, category, 3).await;
        assert_eq!(created.quantity, Quantity::new(3).unwrap());

        let listed = catalog
            .list_parts(&PartFilter::new(Some("Integration".into()), Some(category)))
            .await
            .unwrap();
        assert!(listed.iter().any(|p| p.id == created.id));

        assert_eq!(catalog.set_image_url(created.id, "/static/images/x.png").await.unwrap(), 1);
        let fetched = catalog.get_part(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.image_url, "/static/images/x.png");

        assert_eq!(catalog.delete_part(created.id).await.unwrap(), 1);
        assert_eq!(stored_quantity(&pool, created.inventory_id).await, None);
        assert_eq!(catalog.delete_part(created.id).await.unwrap(), 0);

        let err = catalog
            .create_part(&NewPart::new("Orphan", CategoryId::new(-1), 1).unwrap())
            .await
            .unwrap_err();
        assert_eq!(err, CatalogError::CategoryNotFound(CategoryId::new(-1)));
    }
}
