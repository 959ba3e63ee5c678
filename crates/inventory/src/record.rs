use serde::{Deserialize, Serialize};

use mast_core::{DomainError, DomainResult, Entity, InventoryId, PartId};

use crate::quantity::Quantity;

/// Stock row of a part (1:1 with the part).
///
/// Records are created together with their part and deleted by cascade when
/// the part goes away; the inventory store only ever rewrites `quantity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryRecord {
    id: InventoryId,
    part_id: PartId,
    quantity: Quantity,
}

impl InventoryRecord {
    pub fn new(id: InventoryId, part_id: PartId, quantity: Quantity) -> Self {
        Self {
            id,
            part_id,
            quantity,
        }
    }

    /// Rebuild a record from stored column values.
    ///
    /// A negative stored quantity means the storage layer let an invalid
    /// write through, which is reported as an invariant violation.
    pub fn from_stored(id: i64, part_id: i64, quantity: i64) -> DomainResult<Self> {
        let quantity = Quantity::new(quantity).map_err(|_| {
            DomainError::invariant(format!("inventory {id} has negative quantity {quantity}"))
        })?;
        Ok(Self::new(InventoryId::new(id), PartId::new(part_id), quantity))
    }

    pub fn part_id(&self) -> PartId {
        self.part_id
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Last write wins; there is no version check.
    pub fn set_quantity(&mut self, quantity: Quantity) {
        self.quantity = quantity;
    }
}

impl Entity for InventoryRecord {
    type Id = InventoryId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// One requested mutation inside a batch.
///
/// The quantity is kept raw: batch validation happens item by item inside the
/// store's transaction so the offending id can be reported.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchUpdateItem {
    pub id: InventoryId,
    pub quantity: i64,
}

impl BatchUpdateItem {
    pub fn new(id: impl Into<InventoryId>, quantity: i64) -> Self {
        Self {
            id: id.into(),
            quantity,
        }
    }

    pub fn validated_quantity(&self) -> DomainResult<Quantity> {
        Quantity::new(self.quantity).map_err(|_| {
            DomainError::validation(format!(
                "quantity for item {} cannot be negative",
                self.id
            ))
        })
    }
}
