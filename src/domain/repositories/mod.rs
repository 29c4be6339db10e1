//! Repository provider for the domain layer
//!
//! Contains:
//! - `RepositoryProvider` — unified access to the per-aggregate stores
//! - `DomainResult` — standard result type for domain operations

use std::sync::Arc;

use super::availability::InventoryLedger;
use super::booking::BookingRepository;
use super::room_type::RoomTypeLookup;
use crate::shared::errors::DomainError;

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Provides shared handles to every store the booking core needs.
///
/// Two backends implement it: SeaORM (`SeaOrmRepositoryProvider`) and the
/// in-process maps (`InMemoryRepositoryProvider`). Services receive the
/// individual handles at construction time:
///
/// ```ignore
/// let repos = SeaOrmRepositoryProvider::new(db.clone());
/// let availability = AvailabilityManager::new(repos.ledger(), repos.room_types(), locks, cfg);
/// ```
pub trait RepositoryProvider: Send + Sync {
    fn ledger(&self) -> Arc<dyn InventoryLedger>;
    fn bookings(&self) -> Arc<dyn BookingRepository>;
    fn room_types(&self) -> Arc<dyn RoomTypeLookup>;
}
