use std::sync::Arc;

use axum::{extract::Extension, response::IntoResponse, Json};

use crate::app::errors;
use crate::app::services::AppServices;

pub async fn list_categories(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.catalog().list_categories().await {
        Ok(categories) => Json(categories).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}
