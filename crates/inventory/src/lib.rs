//! Inventory domain module.
//!
//! This crate contains the business rules for parts and their stock,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod catalog;
pub mod image;
pub mod quantity;
pub mod record;

pub use catalog::{Category, NewPart, Part, PartFilter};
pub use image::{ImageFormat, StoredImageName};
pub use quantity::Quantity;
pub use record::{BatchUpdateItem, InventoryRecord};
