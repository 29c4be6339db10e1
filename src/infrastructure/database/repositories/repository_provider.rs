//! SeaORM implementation of RepositoryProvider

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::domain::{BookingRepository, InventoryLedger, RepositoryProvider, RoomTypeLookup};

use super::availability_repository::SeaOrmInventoryLedger;
use super::booking_repository::SeaOrmBookingRepository;
use super::room_type_repository::SeaOrmRoomTypeRepository;

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository accessors.
///
/// ```ignore
/// let repos = SeaOrmRepositoryProvider::new(db.clone());
/// let nights = repos.ledger().find_range(scope, check_in, check_out).await?;
/// let booking = repos.bookings().find_by_confirmation_code("HB-1A2B3C4D5E").await?;
/// ```
#[derive(Clone)]
pub struct SeaOrmRepositoryProvider {
    ledger: Arc<SeaOrmInventoryLedger>,
    bookings: Arc<SeaOrmBookingRepository>,
    room_types: Arc<SeaOrmRoomTypeRepository>,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            ledger: Arc::new(SeaOrmInventoryLedger::new(db.clone())),
            bookings: Arc::new(SeaOrmBookingRepository::new(db.clone())),
            room_types: Arc::new(SeaOrmRoomTypeRepository::new(db)),
        }
    }
}

impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn ledger(&self) -> Arc<dyn InventoryLedger> {
        self.ledger.clone()
    }

    fn bookings(&self) -> Arc<dyn BookingRepository> {
        self.bookings.clone()
    }

    fn room_types(&self) -> Arc<dyn RoomTypeLookup> {
        self.room_types.clone()
    }
}
