use std::sync::Arc;

use axum::{
    extract::{Extension, Multipart, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};

use mast_core::{CategoryId, DomainError, PartId};
use mast_inventory::{ImageFormat, NewPart, Part, PartFilter, StoredImageName};

use crate::app::dto::{DeletePartResponse, ImageUploadResponse, PartsQuery};
use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_parts).post(create_part))
        .route("/:id", delete(delete_part))
        .route("/:id/image", post(upload_image))
}

/// A file field of a multipart request.
struct Upload {
    format: ImageFormat,
    bytes: Vec<u8>,
}

/// Fields of `POST /parts` and `POST /parts/{id}/image`.
#[derive(Default)]
struct PartForm {
    title: Option<String>,
    category_id: Option<String>,
    quantity: Option<String>,
    file: Option<Upload>,
}

async fn read_form(mut multipart: Multipart) -> Result<PartForm, axum::response::Response> {
    let mut form = PartForm::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(f)) => f,
            Ok(None) => break,
            Err(e) => {
                return Err(errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_multipart",
                    e.body_text(),
                ))
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);

        if name == "file" {
            let bytes = field.bytes().await.map_err(|e| {
                errors::json_error(StatusCode::BAD_REQUEST, "invalid_multipart", e.body_text())
            })?;
            // Browsers send an empty, unnamed part when no file was chosen.
            let file_name = file_name.unwrap_or_default();
            if file_name.is_empty() && bytes.is_empty() {
                continue;
            }
            let format =
                ImageFormat::from_file_name(&file_name).map_err(errors::domain_error_to_response)?;
            form.file = Some(Upload {
                format,
                bytes: bytes.to_vec(),
            });
            continue;
        }

        let text = field.text().await.map_err(|e| {
            errors::json_error(StatusCode::BAD_REQUEST, "invalid_multipart", e.body_text())
        })?;
        match name.as_str() {
            "title" => form.title = Some(text),
            "category_id" => form.category_id = Some(text),
            "quantity" => form.quantity = Some(text),
            _ => {}
        }
    }

    Ok(form)
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, DomainError> {
    value
        .as_deref()
        .ok_or_else(|| DomainError::validation(format!("{field} is required")))
}

fn new_part_from_form(form: &PartForm) -> Result<NewPart, DomainError> {
    let title = required(&form.title, "title")?;
    let category_id: CategoryId = required(&form.category_id, "category_id")?.parse()?;
    let quantity: i64 = required(&form.quantity, "quantity")?
        .trim()
        .parse()
        .map_err(|_| DomainError::validation("quantity must be an integer"))?;
    NewPart::new(title, category_id, quantity)
}

pub async fn list_parts(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<PartsQuery>,
) -> axum::response::Response {
    let category_id = match query.category_id() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let filter = PartFilter::new(query.name, category_id);

    match services.catalog().list_parts(&filter).await {
        Ok(parts) => Json(parts).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn create_part(
    Extension(services): Extension<Arc<AppServices>>,
    multipart: Multipart,
) -> axum::response::Response {
    let form = match read_form(multipart).await {
        Ok(f) => f,
        Err(resp) => return resp,
    };
    let new_part = match new_part_from_form(&form) {
        Ok(p) => p,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let mut part = match services.catalog().create_part(&new_part).await {
        Ok(p) => p,
        Err(e) => return errors::catalog_error_to_response(e),
    };

    if let Some(upload) = form.file {
        match attach_image(&services, &part, upload).await {
            Ok(url) => part.image_url = url,
            Err(resp) => {
                // The request failed as a whole, so the part must not survive it.
                discard_part(&services, part.id).await;
                return resp;
            }
        }
    }

    tracing::info!(part_id = %part.id, inventory_id = %part.inventory_id, "part created");
    (StatusCode::CREATED, Json(part)).into_response()
}

pub async fn delete_part(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: PartId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let existing = match services.catalog().get_part(id).await {
        Ok(p) => p,
        Err(e) => return errors::catalog_error_to_response(e),
    };

    match services.catalog().delete_part(id).await {
        Ok(0) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "Part not found"),
        Ok(_) => {
            if let Some(part) = existing {
                remove_image_quietly(&services, &part.image_url).await;
            }
            Json(DeletePartResponse {
                message: "Part deleted successfully",
                parts_id: id,
            })
            .into_response()
        }
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn upload_image(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> axum::response::Response {
    let id: PartId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let form = match read_form(multipart).await {
        Ok(f) => f,
        Err(resp) => return resp,
    };
    let Some(upload) = form.file else {
        return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", "file is required");
    };

    let part = match services.catalog().get_part(id).await {
        Ok(Some(p)) => p,
        Ok(None) => return errors::json_error(StatusCode::NOT_FOUND, "not_found", "Part not found"),
        Err(e) => return errors::catalog_error_to_response(e),
    };

    let image_url = match attach_image(&services, &part, upload).await {
        Ok(url) => url,
        Err(resp) => return resp,
    };
    remove_image_quietly(&services, &part.image_url).await;

    Json(ImageUploadResponse {
        message: "Image uploaded successfully",
        parts_id: id,
        image_url,
    })
    .into_response()
}

/// Store the file and point the part at it; returns the new URL.
async fn attach_image(
    services: &AppServices,
    part: &Part,
    upload: Upload,
) -> Result<String, axum::response::Response> {
    let name = StoredImageName::generate(part.id, upload.format);
    services
        .images()
        .save(&name, &upload.bytes)
        .await
        .map_err(errors::image_error_to_response)?;

    let url = name.url();
    match services.catalog().set_image_url(part.id, &url).await {
        Ok(0) => {
            // Deleted concurrently.
            remove_image_quietly(services, &url).await;
            Err(errors::json_error(StatusCode::NOT_FOUND, "not_found", "Part not found"))
        }
        Ok(_) => Ok(url),
        Err(e) => {
            remove_image_quietly(services, &url).await;
            Err(errors::catalog_error_to_response(e))
        }
    }
}

/// Undo a part creation whose image could not be attached.
async fn discard_part(services: &AppServices, id: PartId) {
    if let Err(e) = services.catalog().delete_part(id).await {
        tracing::warn!(error = %e, part_id = %id, "failed to remove part after image failure");
    }
}

/// Best-effort removal of a previously stored image given its public URL.
async fn remove_image_quietly(services: &AppServices, url: &str) {
    let Some(file) = url.rsplit('/').next().filter(|f| !f.is_empty()) else {
        return;
    };
    let Ok(name) = StoredImageName::parse(file) else {
        return;
    };
    if let Err(e) = services.images().remove(&name).await {
        tracing::warn!(error = %e, image = name.as_str(), "failed to remove image");
    }
}
