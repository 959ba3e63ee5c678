use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::put,
    Json, Router,
};

use mast_core::InventoryId;
use mast_inventory::BatchUpdateItem;

use crate::app::dto::{MessageResponse, UpdateInventoryRequest, UpdateInventoryResponse};
use crate::app::errors;
use crate::app::services::AppServices;

const UPDATED: &str = "Inventory updated successfully";

pub fn router() -> Router {
    Router::new()
        .route("/batch", put(update_batch))
        .route("/:id", put(update_single))
}

pub async fn update_single(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateInventoryRequest>,
) -> axum::response::Response {
    let id: InventoryId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    if body.quantity < 0 {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "Quantity cannot be negative",
        );
    }

    match services.update_single(id, body.quantity).await {
        Ok(0) => errors::json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            "Inventory item not found",
        ),
        Ok(_) => Json(UpdateInventoryResponse {
            message: UPDATED,
            inventory_id: id,
            new_quantity: body.quantity,
        })
        .into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

pub async fn update_batch(
    Extension(services): Extension<Arc<AppServices>>,
    Json(items): Json<Vec<BatchUpdateItem>>,
) -> axum::response::Response {
    match services.update_batch(&items).await {
        Ok(outcome) => {
            tracing::info!(
                items_applied = outcome.items_applied,
                rows_matched = outcome.rows_matched,
                "inventory batch applied"
            );
            Json(MessageResponse { message: UPDATED }).into_response()
        }
        Err(e) => errors::inventory_error_to_response(e),
    }
}
