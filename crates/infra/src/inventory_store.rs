//! Inventory store: quantity updates with validation and transactional atomicity.
//!
//! ## Single update
//!
//! One autocommitted `UPDATE` keyed by id. The returned row count is the
//! existence signal: `0` means no such stock row, which the HTTP layer turns
//! into a not-found response. It is not an error at this level.
//!
//! ## Batch update
//!
//! 1. Begin a transaction on one exclusive connection.
//! 2. For each item, in input order: reject a negative quantity (rolling back
//!    everything issued so far), otherwise issue the update.
//! 3. Commit.
//!
//! Any failure after `begin` rolls back. If the rollback fails too, the
//! original error is returned and the rollback failure is only logged; the
//! connection then closes its transaction when it is dropped.
//!
//! Ids that match no row are accepted by default (the row count is reported
//! in [`BatchOutcome::rows_matched`]). With [`StoreConfig::strict_batch`] such
//! an item fails the whole batch with [`InventoryError::NotFound`].

use std::future::Future;

use thiserror::Error;
use tracing::{debug, instrument, warn};

use mast_core::{DomainError, InventoryId};
use mast_inventory::{BatchUpdateItem, Quantity};

use crate::config::StoreConfig;
use crate::db::{ConnectionProvider, InventoryConnection, StorageError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InventoryError {
    /// A requested quantity is negative. Nothing was applied.
    #[error("{reason}")]
    Validation { item_id: InventoryId, reason: String },

    #[error("batch must contain at least one item")]
    EmptyBatch,

    /// Strict batch mode only: an item matched no stock row.
    #[error("inventory item {0} not found")]
    NotFound(InventoryId),

    /// No connection could be acquired; nothing was attempted.
    #[error("database unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Storage(StorageError),
}

impl InventoryError {
    fn validation(item_id: InventoryId, err: DomainError) -> Self {
        let reason = match err {
            DomainError::Validation(msg) => msg,
            other => other.to_string(),
        };
        Self::Validation { item_id, reason }
    }
}

impl From<StorageError> for InventoryError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Unavailable(msg) => InventoryError::Unavailable(msg),
            other => InventoryError::Storage(other),
        }
    }
}

/// Result of a committed batch.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub items_applied: usize,
    /// Rows actually matched; lower than `items_applied` when ids were missing.
    pub rows_matched: u64,
}

/// Applies quantity changes through connections from `P`.
#[derive(Debug, Clone)]
pub struct InventoryStore<P> {
    provider: P,
    config: StoreConfig,
}

impl<P> InventoryStore<P>
where
    P: ConnectionProvider,
{
    pub fn new(provider: P, config: StoreConfig) -> Self {
        Self { provider, config }
    }

    /// Overwrite one stock row's quantity; returns rows affected (0 or 1).
    #[instrument(skip(self), fields(inventory_id = %id), err)]
    pub async fn update_single(&self, id: InventoryId, quantity: i64) -> Result<u64, InventoryError> {
        let quantity =
            Quantity::new(quantity).map_err(|e| InventoryError::validation(id, e))?;

        let mut conn = self.provider.acquire().await?;
        let rows = self
            .bounded("update_quantity", conn.update_quantity(id, quantity))
            .await?;

        debug!(rows, "single inventory update applied");
        Ok(rows)
    }

    /// Apply every item or none of them.
    #[instrument(skip(self, items), fields(item_count = items.len()), err)]
    pub async fn update_batch(
        &self,
        items: &[BatchUpdateItem],
    ) -> Result<BatchOutcome, InventoryError> {
        if items.is_empty() {
            return Err(InventoryError::EmptyBatch);
        }

        let mut conn = self.provider.acquire().await?;
        self.bounded("begin", conn.begin()).await?;

        let outcome = match self.apply_items(&mut conn, items).await {
            Ok(outcome) => outcome,
            Err(err) => {
                self.rollback(&mut conn).await;
                return Err(err);
            }
        };

        if let Err(err) = self.bounded("commit", conn.commit()).await {
            self.rollback(&mut conn).await;
            return Err(err.into());
        }

        debug!(
            items_applied = outcome.items_applied,
            rows_matched = outcome.rows_matched,
            "inventory batch committed"
        );
        Ok(outcome)
    }

    async fn apply_items(
        &self,
        conn: &mut P::Connection,
        items: &[BatchUpdateItem],
    ) -> Result<BatchOutcome, InventoryError> {
        let mut rows_matched = 0;
        for item in items {
            let quantity = item
                .validated_quantity()
                .map_err(|e| InventoryError::validation(item.id, e))?;

            let rows = self
                .bounded("update_quantity", conn.update_quantity(item.id, quantity))
                .await?;
            if rows == 0 && self.config.strict_batch {
                return Err(InventoryError::NotFound(item.id));
            }
            rows_matched += rows;
        }

        Ok(BatchOutcome {
            items_applied: items.len(),
            rows_matched,
        })
    }

    /// Roll back, keeping the caller's error authoritative.
    async fn rollback(&self, conn: &mut P::Connection) {
        if let Err(err) = self.bounded("rollback", conn.rollback()).await {
            warn!(error = %err, state = ?conn.state(), "rollback failed");
        }
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T, StorageError>>,
    ) -> Result<T, StorageError> {
        tokio::time::timeout(self.config.statement_timeout, fut)
            .await
            .map_err(|_| StorageError::Timeout(operation))?
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::db::{FaultPlan, InMemoryDatabase, TxState};
    use proptest::prelude::*;

    fn q(v: i64) -> Quantity {
        Quantity::new(v).unwrap()
    }

    /// Two stock rows (ids 1 and 2) with quantities 5 and 7.
    fn setup(config: StoreConfig) -> (InMemoryDatabase, InventoryStore<InMemoryDatabase>) {
        let db = InMemoryDatabase::new();
        db.seed_part("Hex bolt", "Fasteners", q(5)).unwrap();
        db.seed_part("Hex nut", "Fasteners", q(7)).unwrap();
        let store = InventoryStore::new(db.clone(), config);
        (db, store)
    }

    fn id(v: i64) -> InventoryId {
        InventoryId::new(v)
    }

    #[tokio::test]
    async fn single_update_on_existing_row() {
        let (db, store) = setup(StoreConfig::default());

        assert_eq!(store.update_single(id(1), 50).await.unwrap(), 1);
        assert_eq!(db.quantity(id(1)), Some(q(50)));
        assert_eq!(db.live_connections(), 0);
    }

    #[tokio::test]
    async fn single_update_on_missing_row_affects_nothing() {
        let (db, store) = setup(StoreConfig::default());

        assert_eq!(store.update_single(id(999), 50).await.unwrap(), 0);
        assert_eq!(db.quantity(id(1)), Some(q(5)));
        assert_eq!(db.quantity(id(2)), Some(q(7)));
    }

    #[tokio::test]
    async fn single_update_rejects_negative_before_acquiring() {
        let (db, store) = setup(StoreConfig::default());
        db.inject_faults(FaultPlan {
            unavailable: true,
            ..FaultPlan::default()
        });

        let err = store.update_single(id(1), -10).await.unwrap_err();

        assert_eq!(
            err,
            InventoryError::Validation {
                item_id: id(1),
                reason: "quantity cannot be negative".into()
            }
        );
        assert_eq!(db.quantity(id(1)), Some(q(5)));
    }

    #[tokio::test]
    async fn single_update_is_idempotent() {
        let (db, store) = setup(StoreConfig::default());

        store.update_single(id(2), 3).await.unwrap();
        store.update_single(id(2), 3).await.unwrap();
        assert_eq!(db.quantity(id(2)), Some(q(3)));
    }

    #[tokio::test]
    async fn batch_applies_all_items() {
        let (db, store) = setup(StoreConfig::default());

        let outcome = store
            .update_batch(&[BatchUpdateItem::new(1, 10), BatchUpdateItem::new(2, 20)])
            .await
            .unwrap();

        assert_eq!(outcome, BatchOutcome { items_applied: 2, rows_matched: 2 });
        assert_eq!(db.quantity(id(1)), Some(q(10)));
        assert_eq!(db.quantity(id(2)), Some(q(20)));
        assert_eq!(db.live_connections(), 0);
    }

    #[tokio::test]
    async fn batch_with_negative_item_rolls_back_earlier_items() {
        let (db, store) = setup(StoreConfig::default());

        let err = store
            .update_batch(&[BatchUpdateItem::new(1, 10), BatchUpdateItem::new(2, -5)])
            .await
            .unwrap_err();

        assert!(matches!(err, InventoryError::Validation { item_id, .. } if item_id == id(2)));
        assert_eq!(err.to_string(), "quantity for item 2 cannot be negative");
        assert_eq!(db.quantity(id(1)), Some(q(5)));
        assert_eq!(db.quantity(id(2)), Some(q(7)));
        assert_eq!(db.live_connections(), 0);
    }

    #[tokio::test]
    async fn batch_storage_failure_rolls_back_and_releases() {
        let (db, store) = setup(StoreConfig::default());
        db.inject_faults(FaultPlan {
            fail_statement: Some(1),
            ..FaultPlan::default()
        });

        let err = store
            .update_batch(&[BatchUpdateItem::new(1, 10)])
            .await
            .unwrap_err();

        assert!(matches!(err, InventoryError::Storage(StorageError::Query { .. })));
        assert_eq!(db.quantity(id(1)), Some(q(5)));
        assert_eq!(db.live_connections(), 0);
    }

    #[tokio::test]
    async fn failure_on_a_later_statement_undoes_the_earlier_ones() {
        let (db, store) = setup(StoreConfig::default());
        db.inject_faults(FaultPlan {
            fail_statement: Some(2),
            ..FaultPlan::default()
        });

        store
            .update_batch(&[BatchUpdateItem::new(1, 10), BatchUpdateItem::new(2, 20)])
            .await
            .unwrap_err();

        assert_eq!(db.quantity(id(1)), Some(q(5)));
        assert_eq!(db.quantity(id(2)), Some(q(7)));
    }

    #[tokio::test]
    async fn failed_rollback_does_not_mask_the_original_error() {
        let (db, store) = setup(StoreConfig::default());
        db.inject_faults(FaultPlan {
            fail_statement: Some(2),
            fail_rollback: true,
            ..FaultPlan::default()
        });

        let err = store
            .update_batch(&[BatchUpdateItem::new(1, 10), BatchUpdateItem::new(2, 20)])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            InventoryError::Storage(StorageError::Query { operation: "update_quantity", .. })
        ));
        assert_eq!(db.quantity(id(1)), Some(q(5)));
        assert_eq!(db.live_connections(), 0);
    }

    #[tokio::test]
    async fn failed_commit_reports_storage_error_and_applies_nothing() {
        let (db, store) = setup(StoreConfig::default());
        db.inject_faults(FaultPlan {
            fail_commit: true,
            ..FaultPlan::default()
        });

        let err = store
            .update_batch(&[BatchUpdateItem::new(1, 10), BatchUpdateItem::new(2, 20)])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            InventoryError::Storage(StorageError::Transaction { operation: "commit", .. })
        ));
        assert_eq!(db.quantity(id(1)), Some(q(5)));
        assert_eq!(db.quantity(id(2)), Some(q(7)));
    }

    #[tokio::test]
    async fn unavailable_provider_is_reported_without_attempting() {
        let (db, store) = setup(StoreConfig::default());
        db.inject_faults(FaultPlan {
            unavailable: true,
            ..FaultPlan::default()
        });

        assert!(matches!(
            store.update_single(id(1), 1).await,
            Err(InventoryError::Unavailable(_))
        ));
        assert!(matches!(
            store.update_batch(&[BatchUpdateItem::new(1, 1)]).await,
            Err(InventoryError::Unavailable(_))
        ));
        assert_eq!(db.quantity(id(1)), Some(q(5)));
    }

    #[tokio::test]
    async fn empty_batch_is_rejected() {
        let (db, store) = setup(StoreConfig::default());
        assert_eq!(store.update_batch(&[]).await, Err(InventoryError::EmptyBatch));
        assert_eq!(db.live_connections(), 0);
    }

    #[tokio::test]
    async fn missing_id_in_batch_is_tolerated_by_default() {
        let (db, store) = setup(StoreConfig::default());

        let outcome = store
            .update_batch(&[BatchUpdateItem::new(1, 10), BatchUpdateItem::new(999, 5)])
            .await
            .unwrap();

        assert_eq!(outcome, BatchOutcome { items_applied: 2, rows_matched: 1 });
        assert_eq!(db.quantity(id(1)), Some(q(10)));
    }

    #[tokio::test]
    async fn strict_mode_fails_the_batch_on_missing_id() {
        let (db, store) = setup(StoreConfig {
            strict_batch: true,
            ..StoreConfig::default()
        });

        let err = store
            .update_batch(&[BatchUpdateItem::new(1, 10), BatchUpdateItem::new(999, 5)])
            .await
            .unwrap_err();

        assert_eq!(err, InventoryError::NotFound(id(999)));
        assert_eq!(db.quantity(id(1)), Some(q(5)));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_statement_times_out_as_storage_error() {
        let (db, store) = setup(StoreConfig {
            statement_timeout: Duration::from_millis(50),
            ..StoreConfig::default()
        });
        db.inject_faults(FaultPlan {
            statement_delay: Some(Duration::from_secs(5)),
            ..FaultPlan::default()
        });

        let err = store
            .update_batch(&[BatchUpdateItem::new(1, 10)])
            .await
            .unwrap_err();

        assert_eq!(err, InventoryError::Storage(StorageError::Timeout("update_quantity")));
        assert_eq!(db.quantity(id(1)), Some(q(5)));
        assert_eq!(db.live_connections(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_batch_leaves_nothing_open() {
        let (db, store) = setup(StoreConfig::default());
        db.inject_faults(FaultPlan {
            statement_delay: Some(Duration::from_secs(5)),
            ..FaultPlan::default()
        });

        let batch = [BatchUpdateItem::new(1, 10), BatchUpdateItem::new(2, 20)];
        let abandoned =
            tokio::time::timeout(Duration::from_secs(7), store.update_batch(&batch)).await;

        assert!(abandoned.is_err());
        assert_eq!(db.live_connections(), 0);
        assert_eq!(db.quantity(id(1)), Some(q(5)));
        assert_eq!(db.quantity(id(2)), Some(q(7)));
    }

    #[tokio::test]
    async fn connection_state_ends_committed_after_success() {
        let (db, _store) = setup(StoreConfig::default());
        let mut conn = db.acquire().await.unwrap();
        conn.begin().await.unwrap();
        assert_eq!(conn.state(), TxState::Open);
        conn.commit().await.unwrap();
        assert_eq!(conn.state(), TxState::Committed);
    }

    fn batch_strategy() -> impl Strategy<Value = Vec<(bool, i64)>> {
        // (targets row 1 instead of row 2, quantity)
        proptest::collection::vec((any::<bool>(), -20i64..100), 1..12)
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Property: a batch is applied entirely or not at all.
        #[test]
        fn batch_is_all_or_nothing(requests in batch_strategy()) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .unwrap();

            rt.block_on(async {
                let (db, store) = setup(StoreConfig::default());
                let items: Vec<BatchUpdateItem> = requests
                    .iter()
                    .map(|(first, qty)| BatchUpdateItem::new(if *first { 1 } else { 2 }, *qty))
                    .collect();

                let result = store.update_batch(&items).await;
                let has_negative = items.iter().any(|i| i.quantity < 0);

                if has_negative {
                    let first_bad = items.iter().find(|i| i.quantity < 0).unwrap().id;
                    prop_assert!(
                        matches!(result, Err(InventoryError::Validation { item_id, .. }) if item_id == first_bad),
                        "expected a validation error for item {}, got {:?}",
                        first_bad,
                        result
                    );
                    prop_assert_eq!(db.quantity(id(1)), Some(q(5)));
                    prop_assert_eq!(db.quantity(id(2)), Some(q(7)));
                } else {
                    prop_assert!(result.is_ok());
                    // Last write per id wins.
                    for target in [1, 2] {
                        let expected = items
                            .iter()
                            .rev()
                            .find(|i| i.id == id(target))
                            .map(|i| q(i.quantity))
                            .unwrap_or(if target == 1 { q(5) } else { q(7) });
                        prop_assert_eq!(db.quantity(id(target)), Some(expected));
                    }
                }
                prop_assert_eq!(db.live_connections(), 0);
                Ok::<(), TestCaseError>(())
            })?;
        }
    }
}
