//! Per-date inventory counters
//!
//! Contains the availability record, query read-models, and the ledger
//! interface.

pub mod model;
pub mod repository;

pub use model::{
    AvailabilityKey, AvailabilityRecord, CalendarDay, OverbookingAlert, RangeAdjustOutcome,
};
pub use repository::InventoryLedger;
