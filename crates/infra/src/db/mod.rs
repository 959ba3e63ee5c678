//! Connection provider boundary.
//!
//! The inventory store never talks to a pool directly. It asks a
//! [`ConnectionProvider`] for an exclusive [`InventoryConnection`], drives the
//! transaction itself, and drops the connection when done. Dropping is the
//! release: it happens exactly once on every exit path, including
//! cancellation. A connection dropped with its transaction still open must
//! discard that transaction (the Postgres adapter closes the socket, the
//! in-memory one drops its write buffer).

use async_trait::async_trait;
use thiserror::Error;

use mast_core::InventoryId;
use mast_inventory::Quantity;

pub mod in_memory;
pub mod postgres;

pub use in_memory::{FaultPlan, InMemoryConnection, InMemoryDatabase};
pub use postgres::{bootstrap_schema, connect_with_retry, PgConnectionProvider, PgInventoryConnection};

/// Transaction state of a connection.
///
/// `Idle → Open → {Committed | RolledBack}`; a finished connection may begin
/// again.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TxState {
    Idle,
    Open,
    Committed,
    RolledBack,
}

impl TxState {
    pub fn is_open(self) -> bool {
        matches!(self, TxState::Open)
    }
}

/// Data-access failure.
///
/// Messages may contain driver detail; they are for logs, not for clients.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// No connection could be obtained.
    #[error("database unavailable: {0}")]
    Unavailable(String),

    /// A statement or transaction-control call exceeded its time bound.
    #[error("{0} timed out")]
    Timeout(&'static str),

    #[error("query failed in {operation}: {message}")]
    Query {
        operation: &'static str,
        message: String,
    },

    #[error("transaction {operation} failed: {message}")]
    Transaction {
        operation: &'static str,
        message: String,
    },
}

impl StorageError {
    pub fn query(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Query {
            operation,
            message: message.into(),
        }
    }

    pub fn transaction(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Transaction {
            operation,
            message: message.into(),
        }
    }
}

/// Exclusive database handle used by the inventory store.
///
/// `update_quantity` is the only statement the store issues:
/// `UPDATE inventory SET quantity = $1 WHERE id = $2`, returning rows affected.
/// Outside a transaction it autocommits.
#[async_trait]
pub trait InventoryConnection: Send {
    fn state(&self) -> TxState;

    async fn begin(&mut self) -> Result<(), StorageError>;

    async fn update_quantity(
        &mut self,
        id: InventoryId,
        quantity: Quantity,
    ) -> Result<u64, StorageError>;

    async fn commit(&mut self) -> Result<(), StorageError>;

    async fn rollback(&mut self) -> Result<(), StorageError>;
}

/// Source of exclusive connections (a pool, in practice).
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    type Connection: InventoryConnection;

    /// Check out a connection; failure is always [`StorageError::Unavailable`].
    async fn acquire(&self) -> Result<Self::Connection, StorageError>;
}

#[async_trait]
impl<P> ConnectionProvider for std::sync::Arc<P>
where
    P: ConnectionProvider + ?Sized,
{
    type Connection = P::Connection;

    async fn acquire(&self) -> Result<Self::Connection, StorageError> {
        (**self).acquire().await
    }
}

/// Map SQLx errors to [`StorageError`].
///
/// | SQLx error | StorageError |
/// |---|---|
/// | `PoolTimedOut`, `PoolClosed` | `Unavailable` |
/// | `Database` | `Query` (driver message + SQLSTATE) |
/// | anything else (I/O, protocol, decode) | `Query` |
pub(crate) fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StorageError {
    match err {
        sqlx::Error::PoolTimedOut => {
            StorageError::Unavailable(format!("timed out waiting for a connection in {operation}"))
        }
        sqlx::Error::PoolClosed => {
            StorageError::Unavailable(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.into_owned()).unwrap_or_default();
            StorageError::query(operation, format!("{} (sqlstate {code})", db_err.message()))
        }
        other => StorageError::query(operation, other.to_string()),
    }
}
