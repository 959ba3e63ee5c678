use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::{header, StatusCode},
    response::IntoResponse,
};

use mast_inventory::StoredImageName;

use crate::app::errors;
use crate::app::services::AppServices;

pub async fn serve_image(
    Extension(services): Extension<Arc<AppServices>>,
    Path(file): Path<String>,
) -> axum::response::Response {
    let name = match StoredImageName::parse(&file) {
        Ok(n) => n,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.images().load(&name).await {
        Ok(Some(bytes)) => (
            [(header::CONTENT_TYPE, name.format().content_type())],
            bytes,
        )
            .into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "Image not found"),
        Err(e) => errors::image_error_to_response(e),
    }
}
