//! Database repository implementations
//!
//! Per-aggregate SeaORM repositories + unified RepositoryProvider.

pub mod availability_repository;
pub mod booking_repository;
pub mod repository_provider;
pub mod room_type_repository;

pub use availability_repository::SeaOrmInventoryLedger;
pub use booking_repository::SeaOrmBookingRepository;
pub use repository_provider::SeaOrmRepositoryProvider;
pub use room_type_repository::SeaOrmRoomTypeRepository;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::DomainError;

// ── Conversion helpers ──────────────────────────────────────────

fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::from(e)
}

/// Money is stored in the smallest currency unit.
fn to_cents(amount: Decimal) -> Result<i64, DomainError> {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| DomainError::Validation(format!("amount {} out of range", amount)))
}

fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

#[cfg(test)]
pub(crate) async fn test_db() -> sea_orm::DatabaseConnection {
    use sea_orm_migration::MigratorTrait;

    use crate::infrastructure::database::migrator::Migrator;
    use crate::infrastructure::database::{init_database, DatabaseConfig};

    let db = init_database(&DatabaseConfig::in_memory()).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cents_conversion_rounds_half_away_from_zero() {
        assert_eq!(to_cents(Decimal::new(12345, 2)).unwrap(), 12345);
        assert_eq!(to_cents(Decimal::new(10005, 3)).unwrap(), 1001);
        assert_eq!(from_cents(90000), Decimal::new(900, 0));
    }
}
