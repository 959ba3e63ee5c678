use axum::{routing::get, Router};

pub mod categories;
pub mod images;
pub mod inventory;
pub mod parts;
pub mod system;

pub fn router() -> Router {
    Router::new()
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .route("/categories", get(categories::list_categories))
        .route("/static/images/:file", get(images::serve_image))
        .nest("/inventory", inventory::router())
        .nest("/parts", parts::router())
}
