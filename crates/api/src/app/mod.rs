//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: backend selection (Postgres or in-memory) and store dispatch
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, Extension, Router};
use tower::ServiceBuilder;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Upper bound for request bodies (image uploads are the large ones).
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
pub fn build_app(services: services::AppServices) -> Router {
    routes::router().layer(
        ServiceBuilder::new()
            .layer(Extension(Arc::new(services)))
            .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
    )
}
