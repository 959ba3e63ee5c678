use async_trait::async_trait;

use mast_core::PartId;
use mast_inventory::{Category, NewPart, Part, PartFilter};

use super::{CatalogError, CatalogStore};
use crate::db::InMemoryDatabase;

#[async_trait]
impl CatalogStore for InMemoryDatabase {
    async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        self.ensure_available()?;
        let tables = self.tables()?;
        Ok(tables.categories.values().cloned().collect())
    }

    async fn list_parts(&self, filter: &PartFilter) -> Result<Vec<Part>, CatalogError> {
        self.ensure_available()?;
        let tables = self.tables()?;
        Ok(tables
            .parts
            .values()
            .filter(|row| filter.matches(&row.title, row.category_id))
            .filter_map(|row| tables.join(row))
            .collect())
    }

    async fn get_part(&self, id: PartId) -> Result<Option<Part>, CatalogError> {
        self.ensure_available()?;
        Ok(self.tables()?.part_view(id))
    }

    async fn create_part(&self, new_part: &NewPart) -> Result<Part, CatalogError> {
        self.ensure_available()?;
        let mut tables = self.tables()?;
        tables
            .insert_part(new_part.title(), new_part.category_id(), new_part.quantity())
            .ok_or(CatalogError::CategoryNotFound(new_part.category_id()))
    }

    async fn delete_part(&self, id: PartId) -> Result<u64, CatalogError> {
        self.ensure_available()?;
        Ok(self.tables()?.delete_part(id))
    }

    async fn set_image_url(&self, id: PartId, url: &str) -> Result<u64, CatalogError> {
        self.ensure_available()?;
        let mut tables = self.tables()?;
        match tables.parts.get_mut(&id) {
            Some(row) => {
                row.image_url = Some(url.to_string());
                Ok(1)
            }
            None => Ok(0),
        }
    }
}
