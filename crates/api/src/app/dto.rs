use serde::{Deserialize, Serialize};

use mast_core::{CategoryId, InventoryId, PartId};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct UpdateInventoryRequest {
    pub quantity: i64,
}

/// `GET /parts` filters; both optional, combined with AND. Empty values
/// count as absent.
#[derive(Debug, Default, Deserialize)]
pub struct PartsQuery {
    pub name: Option<String>,
    pub category_id: Option<String>,
}

impl PartsQuery {
    pub fn category_id(&self) -> Result<Option<CategoryId>, mast_core::DomainError> {
        match self.category_id.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw.parse().map(Some),
        }
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct UpdateInventoryResponse {
    pub message: &'static str,
    pub inventory_id: InventoryId,
    pub new_quantity: i64,
}

#[derive(Debug, Serialize)]
pub struct DeletePartResponse {
    pub message: &'static str,
    pub parts_id: PartId,
}

#[derive(Debug, Serialize)]
pub struct ImageUploadResponse {
    pub message: &'static str,
    pub parts_id: PartId,
    pub image_url: String,
}
