//! Postgres-backed catalog store.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tracing::instrument;

use mast_core::{CategoryId, Entity, InventoryId, PartId};
use mast_inventory::{Category, InventoryRecord, NewPart, Part, PartFilter};

use super::{CatalogError, CatalogStore};
use crate::db::{map_sqlx_error, StorageError};

const PART_VIEW_SQL: &str = r#"
    SELECT
        p.id,
        i.id AS inventory_id,
        p.p_name AS title,
        c.name AS category,
        i.quantity,
        COALESCE(p.image_url, '') AS image_url
    FROM parts p
    JOIN inventory i ON p.id = i.parts_id
    JOIN category c ON p.c_id = c.id
"#;

/// Optional name (case-insensitive substring) and category filters.
const PART_FILTER_SQL: &str = r#"
    WHERE ($1::text IS NULL OR strpos(lower(p.p_name), lower($1)) > 0)
      AND ($2::bigint IS NULL OR p.c_id = $2)
    ORDER BY p.id
"#;

#[derive(Debug, FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
}

#[derive(Debug, FromRow)]
struct PartRow {
    id: i64,
    inventory_id: i64,
    title: String,
    category: String,
    quantity: i64,
    image_url: String,
}

impl TryFrom<PartRow> for Part {
    type Error = StorageError;

    fn try_from(row: PartRow) -> Result<Self, Self::Error> {
        let stock = InventoryRecord::from_stored(row.inventory_id, row.id, row.quantity)
            .map_err(|e| StorageError::query("decode_part", e.to_string()))?;
        Ok(Part {
            id: stock.part_id(),
            inventory_id: stock.id(),
            title: row.title,
            category: row.category,
            quantity: stock.quantity(),
            image_url: row.image_url,
        })
    }
}

/// Catalog queries over the `category`, `parts` and `inventory` tables.
#[derive(Debug, Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    #[instrument(skip(self), err)]
    async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        let rows: Vec<CategoryRow> = sqlx::query_as("SELECT id, name FROM category ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_categories", e))?;

        Ok(rows
            .into_iter()
            .map(|r| Category {
                id: CategoryId::new(r.id),
                name: r.name,
            })
            .collect())
    }

    #[instrument(skip(self), err)]
    async fn list_parts(&self, filter: &PartFilter) -> Result<Vec<Part>, CatalogError> {
        let sql = format!("{PART_VIEW_SQL} {PART_FILTER_SQL}");
        let rows: Vec<PartRow> = sqlx::query_as(&sql)
            .bind(filter.name())
            .bind(filter.category_id().map(CategoryId::get))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_parts", e))?;

        let parts = rows
            .into_iter()
            .map(Part::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(parts)
    }

    #[instrument(skip(self), fields(part_id = %id), err)]
    async fn get_part(&self, id: PartId) -> Result<Option<Part>, CatalogError> {
        let sql = format!("{PART_VIEW_SQL} WHERE p.id = $1");
        let row: Option<PartRow> = sqlx::query_as(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_part", e))?;

        Ok(row.map(Part::try_from).transpose()?)
    }

    #[instrument(skip(self, new_part), fields(title = new_part.title()), err)]
    async fn create_part(&self, new_part: &NewPart) -> Result<Part, CatalogError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let category: Option<(String,)> = sqlx::query_as("SELECT name FROM category WHERE id = $1")
            .bind(new_part.category_id().get())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("create_part", e))?;

        // Dropping `tx` rolls back; nothing has been written yet.
        let Some((category,)) = category else {
            return Err(CatalogError::CategoryNotFound(new_part.category_id()));
        };

        let (part_id,): (i64,) =
            sqlx::query_as("INSERT INTO parts (p_name, c_id) VALUES ($1, $2) RETURNING id")
                .bind(new_part.title())
                .bind(new_part.category_id().get())
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("insert_part", e))?;

        let (inventory_id,): (i64,) = sqlx::query_as(
            "INSERT INTO inventory (parts_id, quantity) VALUES ($1, $2) RETURNING id",
        )
        .bind(part_id)
        .bind(new_part.quantity().get())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_inventory", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(Part {
            id: PartId::new(part_id),
            inventory_id: InventoryId::new(inventory_id),
            title: new_part.title().to_string(),
            category,
            quantity: new_part.quantity(),
            image_url: String::new(),
        })
    }

    #[instrument(skip(self), fields(part_id = %id), err)]
    async fn delete_part(&self, id: PartId) -> Result<u64, CatalogError> {
        let result = sqlx::query("DELETE FROM parts WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_part", e))?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self), fields(part_id = %id), err)]
    async fn set_image_url(&self, id: PartId, url: &str) -> Result<u64, CatalogError> {
        let result = sqlx::query("UPDATE parts SET image_url = $1 WHERE id = $2")
            .bind(url)
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_image_url", e))?;
        Ok(result.rows_affected())
    }
}
