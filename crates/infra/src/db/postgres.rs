//! Postgres-backed connection provider.
//!
//! ## Transaction handling
//!
//! `begin`/`commit`/`rollback` are issued as plain statements on a pooled
//! connection, so the store controls the transaction boundary explicitly.
//! If a [`PgInventoryConnection`] is dropped while its transaction is still
//! open (the caller was cancelled, or rollback itself failed), the underlying
//! connection is closed instead of being returned to the pool. Postgres then
//! aborts the transaction server-side, so it is never left open and never
//! handed to the next borrower.

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres};
use tracing::{info, instrument, warn};

use mast_core::InventoryId;
use mast_inventory::Quantity;

use super::{map_sqlx_error, ConnectionProvider, InventoryConnection, StorageError, TxState};
use crate::config::DatabaseConfig;

pub(crate) const UPDATE_QUANTITY_SQL: &str = "UPDATE inventory SET quantity = $1 WHERE id = $2";

/// Idempotent schema bootstrap, one statement per entry.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS category (
        id   BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS parts (
        id        BIGSERIAL PRIMARY KEY,
        p_name    TEXT NOT NULL,
        c_id      BIGINT NOT NULL REFERENCES category (id),
        image_url TEXT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS inventory (
        id       BIGSERIAL PRIMARY KEY,
        parts_id BIGINT NOT NULL UNIQUE REFERENCES parts (id) ON DELETE CASCADE,
        quantity BIGINT NOT NULL CHECK (quantity >= 0)
    )
    "#,
];

/// Create the pool, retrying while the database is not reachable yet.
///
/// Gives up after `connect_retries` attempts with [`StorageError::Unavailable`].
pub async fn connect_with_retry(config: &DatabaseConfig) -> Result<PgPool, StorageError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let result = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await;

        match result {
            Ok(pool) => {
                info!(attempt, pool_size = config.pool_size, "database connection pool created");
                return Ok(pool);
            }
            Err(e) if attempt < config.connect_retries => {
                warn!(
                    attempt,
                    max_attempts = config.connect_retries,
                    retry_in_secs = config.retry_delay.as_secs(),
                    error = %e,
                    "failed to create connection pool; retrying"
                );
                tokio::time::sleep(config.retry_delay).await;
            }
            Err(e) => {
                return Err(StorageError::Unavailable(format!(
                    "failed to create connection pool after {attempt} attempts: {e}"
                )));
            }
        }
    }
}

/// Create the tables if they do not exist yet.
pub async fn bootstrap_schema(pool: &PgPool) -> Result<(), StorageError> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| map_sqlx_error("bootstrap_schema", e))?;
    }
    Ok(())
}

/// Pool-backed [`ConnectionProvider`].
#[derive(Debug, Clone)]
pub struct PgConnectionProvider {
    pool: PgPool,
}

impl PgConnectionProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConnectionProvider for PgConnectionProvider {
    type Connection = PgInventoryConnection;

    async fn acquire(&self) -> Result<Self::Connection, StorageError> {
        let conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| StorageError::Unavailable(format!("failed to acquire connection: {e}")))?;
        Ok(PgInventoryConnection {
            conn,
            state: TxState::Idle,
        })
    }
}

/// Exclusive pooled connection with explicit transaction state.
pub struct PgInventoryConnection {
    conn: PoolConnection<Postgres>,
    state: TxState,
}

impl PgInventoryConnection {
    async fn control(&mut self, operation: &'static str, sql: &'static str) -> Result<(), StorageError> {
        sqlx::query(sql)
            .execute(&mut *self.conn)
            .await
            .map_err(|e| StorageError::transaction(operation, map_sqlx_error(operation, e).to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl InventoryConnection for PgInventoryConnection {
    fn state(&self) -> TxState {
        self.state
    }

    #[instrument(skip(self), level = "debug", err)]
    async fn begin(&mut self) -> Result<(), StorageError> {
        if self.state.is_open() {
            return Err(StorageError::transaction("begin", "transaction already open"));
        }
        self.control("begin", "BEGIN").await?;
        self.state = TxState::Open;
        Ok(())
    }

    async fn update_quantity(
        &mut self,
        id: InventoryId,
        quantity: Quantity,
    ) -> Result<u64, StorageError> {
        let result = sqlx::query(UPDATE_QUANTITY_SQL)
            .bind(quantity.get())
            .bind(id.get())
            .execute(&mut *self.conn)
            .await
            .map_err(|e| map_sqlx_error("update_quantity", e))?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self), level = "debug", err)]
    async fn commit(&mut self) -> Result<(), StorageError> {
        if !self.state.is_open() {
            return Err(StorageError::transaction("commit", "no open transaction"));
        }
        self.control("commit", "COMMIT").await?;
        self.state = TxState::Committed;
        Ok(())
    }

    #[instrument(skip(self), level = "debug", err)]
    async fn rollback(&mut self) -> Result<(), StorageError> {
        if !self.state.is_open() {
            return Ok(());
        }
        self.control("rollback", "ROLLBACK").await?;
        self.state = TxState::RolledBack;
        Ok(())
    }
}

impl Drop for PgInventoryConnection {
    fn drop(&mut self) {
        if self.state.is_open() {
            warn!("connection dropped with an open transaction; closing it");
            self.conn.close_on_drop();
        }
    }
}
