use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use mast_core::DomainError;
use mast_infra::{CatalogError, ImageStoreError, InventoryError, StorageError};

const DB_UNAVAILABLE: &str = "Database connection failed";
const DB_QUERY_FAILED: &str = "Database query error";

pub fn inventory_error_to_response(err: InventoryError) -> axum::response::Response {
    match err {
        InventoryError::Validation { reason, .. } => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", reason)
        }
        InventoryError::EmptyBatch => json_error(
            StatusCode::BAD_REQUEST,
            "empty_batch",
            "batch must contain at least one item",
        ),
        InventoryError::NotFound(id) => json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("Inventory item {id} not found"),
        ),
        InventoryError::Unavailable(msg) => unavailable(&msg),
        InventoryError::Storage(e) => storage_failure(&e),
    }
}

pub fn catalog_error_to_response(err: CatalogError) -> axum::response::Response {
    match err {
        CatalogError::CategoryNotFound(id) => json_error(
            StatusCode::NOT_FOUND,
            "category_not_found",
            format!("Category {id} not found"),
        ),
        CatalogError::Unavailable(msg) => unavailable(&msg),
        CatalogError::Storage(e) => storage_failure(&e),
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::Validation(msg) | DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
    }
}

pub fn image_error_to_response(err: ImageStoreError) -> axum::response::Response {
    tracing::error!(error = %err, "image storage failed");
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "image_storage_error",
        "Image storage error",
    )
}

fn unavailable(detail: &str) -> axum::response::Response {
    tracing::warn!(detail, "database unavailable");
    json_error(StatusCode::SERVICE_UNAVAILABLE, "database_unavailable", DB_UNAVAILABLE)
}

// Statement text and driver detail stay in the logs.
fn storage_failure(err: &StorageError) -> axum::response::Response {
    tracing::error!(error = %err, "storage failure");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", DB_QUERY_FAILED)
}

/// `{"error", "message", "detail"}`; `detail` repeats `message` for clients
/// that read the FastAPI-style field.
pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    let message = message.into();
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": &message,
            "detail": &message,
        })),
    )
        .into_response()
}
