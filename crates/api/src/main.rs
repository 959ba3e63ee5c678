use anyhow::Context;

use mast_api::app::{self, services::AppServices};
use mast_infra::{DatabaseConfig, ImageStore, InMemoryDatabase, ServerConfig, StoreConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    mast_observability::init();

    let server = ServerConfig::from_env();
    let store = StoreConfig::from_env();

    let images = ImageStore::new(&server.static_dir);
    images
        .ensure_dir()
        .await
        .with_context(|| format!("failed to create {}", images.root().display()))?;

    let services = match DatabaseConfig::from_env() {
        Some(db) => AppServices::postgres(&db, store, images)
            .await
            .context("failed to initialise the database")?,
        None => {
            tracing::warn!("DATABASE_URL not set; using the in-memory store (data is lost on restart)");
            let db = InMemoryDatabase::new();
            if server.seed_demo {
                db.seed_demo();
            }
            AppServices::in_memory(db, store, images)
        }
    };

    let app = app::build_app(services);

    let listener = tokio::net::TcpListener::bind(server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", server.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await.context("server terminated")?;
    Ok(())
}
