//! In-memory database with the same transactional contract as Postgres.
//!
//! Intended for tests/dev. Writes issued inside a transaction are buffered on
//! the connection and applied under a single lock on commit, so readers only
//! ever observe committed state. Faults can be injected to exercise the
//! store's failure paths, and the number of checked-out connections is
//! tracked to verify release.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use mast_core::{CategoryId, Entity, InventoryId, PartId};
use mast_inventory::{Category, InventoryRecord, Part, Quantity};

use super::{ConnectionProvider, InventoryConnection, StorageError, TxState};

/// Failures to inject into subsequent operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaultPlan {
    /// `acquire` (and catalog calls) fail with `Unavailable`.
    pub unavailable: bool,
    /// Fail the n-th `update_quantity` (1-based) counted from installation.
    pub fail_statement: Option<u64>,
    pub fail_commit: bool,
    pub fail_rollback: bool,
    /// Sleep before every `update_quantity`.
    pub statement_delay: Option<Duration>,
}

#[derive(Debug, Clone)]
pub(crate) struct PartRow {
    pub(crate) id: PartId,
    pub(crate) title: String,
    pub(crate) category_id: CategoryId,
    pub(crate) image_url: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct Tables {
    pub(crate) categories: BTreeMap<CategoryId, Category>,
    pub(crate) parts: BTreeMap<PartId, PartRow>,
    pub(crate) inventory: BTreeMap<InventoryId, InventoryRecord>,
    last_category_id: i64,
    last_part_id: i64,
    last_inventory_id: i64,
}

impl Tables {
    pub(crate) fn insert_category(&mut self, name: &str) -> CategoryId {
        if let Some(existing) = self.categories.values().find(|c| c.name == name) {
            return existing.id;
        }
        self.last_category_id += 1;
        let id = CategoryId::new(self.last_category_id);
        self.categories.insert(
            id,
            Category {
                id,
                name: name.to_string(),
            },
        );
        id
    }

    /// Insert a part with its stock row. `None` when the category is unknown.
    pub(crate) fn insert_part(
        &mut self,
        title: &str,
        category_id: CategoryId,
        quantity: Quantity,
    ) -> Option<Part> {
        if !self.categories.contains_key(&category_id) {
            return None;
        }
        self.last_part_id += 1;
        let part_id = PartId::new(self.last_part_id);
        self.parts.insert(
            part_id,
            PartRow {
                id: part_id,
                title: title.to_string(),
                category_id,
                image_url: None,
            },
        );

        self.last_inventory_id += 1;
        let inventory_id = InventoryId::new(self.last_inventory_id);
        self.inventory
            .insert(inventory_id, InventoryRecord::new(inventory_id, part_id, quantity));

        self.part_view(part_id)
    }

    /// Delete a part and, by cascade, its stock row.
    pub(crate) fn delete_part(&mut self, part_id: PartId) -> u64 {
        if self.parts.remove(&part_id).is_none() {
            return 0;
        }
        self.inventory.retain(|_, rec| rec.part_id() != part_id);
        1
    }

    /// The joined view served by the catalog.
    pub(crate) fn part_view(&self, part_id: PartId) -> Option<Part> {
        let row = self.parts.get(&part_id)?;
        self.join(row)
    }

    pub(crate) fn join(&self, row: &PartRow) -> Option<Part> {
        let category = self.categories.get(&row.category_id)?;
        let stock = self.inventory.values().find(|r| r.part_id() == row.id)?;
        Some(Part {
            id: row.id,
            inventory_id: stock.id(),
            title: row.title.clone(),
            category: category.name.clone(),
            quantity: stock.quantity(),
            image_url: row.image_url.clone().unwrap_or_default(),
        })
    }
}

#[derive(Debug, Default)]
struct Shared {
    tables: Mutex<Tables>,
    faults: Mutex<FaultPlan>,
    statements: AtomicU64,
    live_connections: AtomicUsize,
}

/// Cheaply clonable handle to one in-memory database.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDatabase {
    shared: Arc<Shared>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the active fault plan and restart statement counting.
    pub fn inject_faults(&self, plan: FaultPlan) {
        if let Ok(mut faults) = self.shared.faults.lock() {
            *faults = plan;
        }
        self.shared.statements.store(0, Ordering::SeqCst);
    }

    /// Connections currently checked out and not yet dropped.
    pub fn live_connections(&self) -> usize {
        self.shared.live_connections.load(Ordering::SeqCst)
    }

    /// Committed quantity of a stock row.
    pub fn quantity(&self, id: InventoryId) -> Option<Quantity> {
        let tables = self.tables().ok()?;
        tables.inventory.get(&id).map(InventoryRecord::quantity)
    }

    pub fn seed_category(&self, name: &str) -> CategoryId {
        match self.tables() {
            Ok(mut tables) => tables.insert_category(name),
            Err(_) => CategoryId::new(0),
        }
    }

    /// Insert a part (creating its category on demand) and return its view.
    pub fn seed_part(&self, title: &str, category: &str, quantity: Quantity) -> Option<Part> {
        let mut tables = self.tables().ok()?;
        let category_id = tables.insert_category(category);
        tables.insert_part(title, category_id, quantity)
    }

    /// A few categories and parts for local development.
    pub fn seed_demo(&self) {
        let rows: &[(&str, &str, i64)] = &[
            ("Hex bolt M3", "Fasteners", 120),
            ("Hex nut M3", "Fasteners", 200),
            ("Deep groove bearing 608", "Bearings", 16),
            ("Timing belt GT2 6mm", "Transmission", 4),
        ];
        self.seed_category("Electronics");
        for (title, category, quantity) in rows {
            if let Ok(q) = Quantity::new(*quantity) {
                self.seed_part(title, category, q);
            }
        }
    }

    pub(crate) fn tables(&self) -> Result<MutexGuard<'_, Tables>, StorageError> {
        self.shared
            .tables
            .lock()
            .map_err(|_| StorageError::query("lock", "in-memory tables lock poisoned"))
    }

    pub(crate) fn faults(&self) -> FaultPlan {
        self.shared
            .faults
            .lock()
            .map(|f| f.clone())
            .unwrap_or_default()
    }

    pub(crate) fn ensure_available(&self) -> Result<(), StorageError> {
        if self.faults().unavailable {
            return Err(StorageError::Unavailable(
                "in-memory database marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ConnectionProvider for InMemoryDatabase {
    type Connection = InMemoryConnection;

    async fn acquire(&self) -> Result<Self::Connection, StorageError> {
        self.ensure_available()?;
        self.shared.live_connections.fetch_add(1, Ordering::SeqCst);
        Ok(InMemoryConnection {
            db: self.clone(),
            state: TxState::Idle,
            pending: Vec::new(),
        })
    }
}

/// Checked-out in-memory connection.
#[derive(Debug)]
pub struct InMemoryConnection {
    db: InMemoryDatabase,
    state: TxState,
    pending: Vec<(InventoryId, Quantity)>,
}

#[async_trait]
impl InventoryConnection for InMemoryConnection {
    fn state(&self) -> TxState {
        self.state
    }

    async fn begin(&mut self) -> Result<(), StorageError> {
        if self.state.is_open() {
            return Err(StorageError::transaction("begin", "transaction already open"));
        }
        self.pending.clear();
        self.state = TxState::Open;
        Ok(())
    }

    async fn update_quantity(
        &mut self,
        id: InventoryId,
        quantity: Quantity,
    ) -> Result<u64, StorageError> {
        let faults = self.db.faults();
        let n = self.db.shared.statements.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = faults.statement_delay {
            tokio::time::sleep(delay).await;
        }
        if faults.fail_statement == Some(n) {
            return Err(StorageError::query("update_quantity", "connection lost mid-statement"));
        }

        let mut tables = self.db.tables()?;
        let Some(record) = tables.inventory.get_mut(&id) else {
            return Ok(0);
        };
        if self.state.is_open() {
            self.pending.push((id, quantity));
        } else {
            record.set_quantity(quantity);
        }
        Ok(1)
    }

    async fn commit(&mut self) -> Result<(), StorageError> {
        if !self.state.is_open() {
            return Err(StorageError::transaction("commit", "no open transaction"));
        }
        if self.db.faults().fail_commit {
            return Err(StorageError::transaction("commit", "commit rejected"));
        }
        let mut tables = self.db.tables()?;
        for (id, quantity) in self.pending.drain(..) {
            // Rows deleted since the write was issued are skipped.
            if let Some(record) = tables.inventory.get_mut(&id) {
                record.set_quantity(quantity);
            }
        }
        self.state = TxState::Committed;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StorageError> {
        if !self.state.is_open() {
            return Ok(());
        }
        if self.db.faults().fail_rollback {
            return Err(StorageError::transaction("rollback", "rollback rejected"));
        }
        self.pending.clear();
        self.state = TxState::RolledBack;
        Ok(())
    }
}

impl Drop for InMemoryConnection {
    fn drop(&mut self) {
        // An open transaction dies with its connection.
        self.pending.clear();
        self.db.shared.live_connections.fetch_sub(1, Ordering::SeqCst);
    }
}
