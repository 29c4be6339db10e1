//! Inventory ledger interface

use async_trait::async_trait;
use chrono::NaiveDate;

use super::model::{AvailabilityKey, AvailabilityRecord, RangeAdjustOutcome};
use crate::domain::room_type::RoomTypeKey;
use crate::domain::DomainResult;

/// Durable per-(property, room type, date) room counters.
///
/// Every write is an atomic conditional update: implementations never let
/// `available_rooms` leave `[0, total_rooms]`, whatever locking the caller
/// did or did not do. Date ranges are half-open `[start, end)`.
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    async fn get(&self, key: &AvailabilityKey) -> DomainResult<Option<AvailabilityRecord>>;

    /// Records of one room type in `[start, end)`, ordered by date.
    async fn find_range(
        &self,
        scope: RoomTypeKey,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DomainResult<Vec<AvailabilityRecord>>;

    /// Records of every room type of a property in `[start, end)`,
    /// ordered by date then room type.
    async fn find_property_range(
        &self,
        property_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DomainResult<Vec<AvailabilityRecord>>;

    /// Create fully available records for the dates in `[start, end)` that
    /// have none yet. Existing records are left untouched. Returns how many
    /// records were created.
    async fn initialize_range(
        &self,
        scope: RoomTypeKey,
        start: NaiveDate,
        end: NaiveDate,
        total_rooms: i32,
    ) -> DomainResult<u64>;

    /// Atomically move `delta` rooms from available to booked (negative
    /// `delta` moves them back) if the current `available_rooms` is at least
    /// `expected_min_available` and the result stays in range.
    ///
    /// Returns `Ok(false)` when the condition does not hold and
    /// `DomainError::NotFound` when the date was never initialized.
    async fn conditional_adjust(
        &self,
        key: &AvailabilityKey,
        delta: i32,
        expected_min_available: i32,
    ) -> DomainResult<bool>;

    /// Apply `delta` to every record of `snapshot` as one unit, provided
    /// each row still carries the snapshot's version and can absorb the
    /// delta. Nothing is written unless the outcome is `Applied`.
    async fn compare_and_adjust_range(
        &self,
        snapshot: &[AvailabilityRecord],
        delta: i32,
    ) -> DomainResult<RangeAdjustOutcome>;

    /// Change `total_rooms` to `new_total` on every existing record in
    /// `[start, end)`, moving `available_rooms` by the same amount. Fails
    /// with a validation error, writing nothing, if any record has more
    /// booked rooms than `new_total`. Returns the number of records changed.
    async fn resize_range(
        &self,
        scope: RoomTypeKey,
        start: NaiveDate,
        end: NaiveDate,
        new_total: i32,
    ) -> DomainResult<u64>;

    /// Delete records in `[start, end)` that have no booked rooms.
    /// Returns the number deleted.
    async fn delete_range(
        &self,
        scope: RoomTypeKey,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DomainResult<u64>;
}
