//! In-memory storage implementation

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::domain::{
    AvailabilityKey, AvailabilityRecord, Booking, BookingRepository, BookingStatus, DomainError,
    DomainResult, InventoryLedger, RangeAdjustOutcome, RepositoryProvider, RoomType, RoomTypeKey,
    RoomTypeLookup,
};

// ── Ledger ──────────────────────────────────────────────────────

/// In-memory ledger for development and testing.
///
/// Rows are grouped per room type, so every multi-date operation runs
/// under the single shard lock of that room type and is atomic.
#[derive(Default)]
pub struct InMemoryLedger {
    rows: DashMap<RoomTypeKey, BTreeMap<NaiveDate, AvailabilityRecord>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record, for invariant checks in tests
    pub fn snapshot(&self) -> Vec<AvailabilityRecord> {
        self.rows
            .iter()
            .flat_map(|e| e.value().values().cloned().collect::<Vec<_>>())
            .collect()
    }
}

#[async_trait]
impl InventoryLedger for InMemoryLedger {
    async fn get(&self, key: &AvailabilityKey) -> DomainResult<Option<AvailabilityRecord>> {
        Ok(self
            .rows
            .get(&key.scope())
            .and_then(|dates| dates.get(&key.date).cloned()))
    }

    async fn find_range(
        &self,
        scope: RoomTypeKey,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DomainResult<Vec<AvailabilityRecord>> {
        if end <= start {
            return Ok(Vec::new());
        }
        Ok(self
            .rows
            .get(&scope)
            .map(|dates| dates.range(start..end).map(|(_, r)| r.clone()).collect())
            .unwrap_or_default())
    }

    async fn find_property_range(
        &self,
        property_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DomainResult<Vec<AvailabilityRecord>> {
        if end <= start {
            return Ok(Vec::new());
        }
        let mut records: Vec<AvailabilityRecord> = self
            .rows
            .iter()
            .filter(|e| e.key().property_id == property_id)
            .flat_map(|e| {
                e.value()
                    .range(start..end)
                    .map(|(_, r)| r.clone())
                    .collect::<Vec<_>>()
            })
            .collect();
        records.sort_by_key(|r| (r.date, r.room_type_id));
        Ok(records)
    }

    async fn initialize_range(
        &self,
        scope: RoomTypeKey,
        start: NaiveDate,
        end: NaiveDate,
        total_rooms: i32,
    ) -> DomainResult<u64> {
        let mut dates = self.rows.entry(scope).or_default();
        let mut created = 0;
        for date in start.iter_days().take_while(|d| *d < end) {
            if let std::collections::btree_map::Entry::Vacant(slot) = dates.entry(date) {
                slot.insert(AvailabilityRecord::new(scope, date, total_rooms));
                created += 1;
            }
        }
        Ok(created)
    }

    async fn conditional_adjust(
        &self,
        key: &AvailabilityKey,
        delta: i32,
        expected_min_available: i32,
    ) -> DomainResult<bool> {
        let missing = || DomainError::not_found("AvailabilityRecord", "key", key);
        let mut dates = self.rows.get_mut(&key.scope()).ok_or_else(missing)?;
        let record = dates.get_mut(&key.date).ok_or_else(missing)?;

        if record.available_rooms < expected_min_available || !record.can_adjust(delta) {
            return Ok(false);
        }
        record.apply(delta);
        Ok(true)
    }

    async fn compare_and_adjust_range(
        &self,
        snapshot: &[AvailabilityRecord],
        delta: i32,
    ) -> DomainResult<RangeAdjustOutcome> {
        let Some(first) = snapshot.first() else {
            return Ok(RangeAdjustOutcome::Applied);
        };
        let scope = first.key().scope();
        if snapshot.iter().any(|r| r.key().scope() != scope) {
            return Err(DomainError::Validation(
                "range adjustment must stay within one room type".into(),
            ));
        }

        let Some(mut dates) = self.rows.get_mut(&scope) else {
            return Ok(RangeAdjustOutcome::VersionConflict);
        };

        // Validate everything before touching anything.
        for expected in snapshot {
            match dates.get(&expected.date) {
                Some(current) if current.version != expected.version => {
                    return Ok(RangeAdjustOutcome::VersionConflict)
                }
                Some(current) if !current.can_adjust(delta) => {
                    return Ok(RangeAdjustOutcome::Insufficient)
                }
                Some(_) => {}
                None => return Ok(RangeAdjustOutcome::VersionConflict),
            }
        }
        for expected in snapshot {
            if let Some(current) = dates.get_mut(&expected.date) {
                current.apply(delta);
            }
        }
        Ok(RangeAdjustOutcome::Applied)
    }

    async fn resize_range(
        &self,
        scope: RoomTypeKey,
        start: NaiveDate,
        end: NaiveDate,
        new_total: i32,
    ) -> DomainResult<u64> {
        if end <= start {
            return Ok(0);
        }
        let Some(mut dates) = self.rows.get_mut(&scope) else {
            return Ok(0);
        };
        if let Some((date, r)) = dates
            .range(start..end)
            .find(|(_, r)| r.booked_rooms > new_total)
        {
            return Err(DomainError::Validation(format!(
                "{} rooms already booked on {}, cannot shrink to {}",
                r.booked_rooms, date, new_total
            )));
        }

        let mut changed = 0;
        for (_, r) in dates.range_mut(start..end) {
            if r.total_rooms != new_total {
                r.available_rooms += new_total - r.total_rooms;
                r.total_rooms = new_total;
                r.version += 1;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn delete_range(
        &self,
        scope: RoomTypeKey,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DomainResult<u64> {
        if end <= start {
            return Ok(0);
        }
        let Some(mut dates) = self.rows.get_mut(&scope) else {
            return Ok(0);
        };
        let doomed: Vec<NaiveDate> = dates
            .range(start..end)
            .filter(|(_, r)| r.booked_rooms == 0)
            .map(|(d, _)| *d)
            .collect();
        for date in &doomed {
            dates.remove(date);
        }
        Ok(doomed.len() as u64)
    }
}

// ── Bookings ────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryBookingRepository {
    bookings: DashMap<Uuid, Booking>,
    by_idempotency_key: DashMap<String, Uuid>,
    by_confirmation_code: DashMap<String, Uuid>,
}

impl InMemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bookings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn insert(&self, booking: &Booking) -> DomainResult<()> {
        match self.bookings.entry(booking.id) {
            Entry::Occupied(_) => {
                return Err(DomainError::Conflict(format!("booking {}", booking.id)))
            }
            Entry::Vacant(slot) => {
                slot.insert(booking.clone());
            }
        }

        // The row goes in first so an index hit always resolves to a booking.
        match self
            .by_confirmation_code
            .entry(booking.confirmation_code.clone())
        {
            Entry::Occupied(_) => {
                self.bookings.remove(&booking.id);
                return Err(DomainError::Conflict(format!(
                    "confirmation code {}",
                    booking.confirmation_code
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(booking.id);
            }
        }

        if let Some(key) = &booking.idempotency_key {
            match self.by_idempotency_key.entry(key.clone()) {
                Entry::Occupied(_) => {
                    self.by_confirmation_code.remove(&booking.confirmation_code);
                    self.bookings.remove(&booking.id);
                    return Err(DomainError::Conflict(format!("idempotency key {}", key)));
                }
                Entry::Vacant(slot) => {
                    slot.insert(booking.id);
                }
            }
        }
        Ok(())
    }

    async fn update(&self, booking: &Booking) -> DomainResult<Booking> {
        let mut stored = self
            .bookings
            .get_mut(&booking.id)
            .ok_or_else(|| DomainError::not_found("Booking", "id", booking.id))?;

        if stored.version != booking.version {
            return Err(DomainError::VersionConflict(format!(
                "booking {} is at version {}, update was based on {}",
                booking.id, stored.version, booking.version
            )));
        }
        let mut next = booking.clone();
        next.version += 1;
        *stored = next.clone();
        Ok(next)
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Booking>> {
        Ok(self.bookings.get(&id).map(|b| b.clone()))
    }

    async fn find_by_idempotency_key(&self, key: &str) -> DomainResult<Option<Booking>> {
        let Some(id) = self.by_idempotency_key.get(key).map(|id| *id) else {
            return Ok(None);
        };
        self.find_by_id(id).await
    }

    async fn find_by_confirmation_code(&self, code: &str) -> DomainResult<Option<Booking>> {
        let Some(id) = self.by_confirmation_code.get(code).map(|id| *id) else {
            return Ok(None);
        };
        self.find_by_id(id).await
    }

    async fn find_by_user(&self, user_id: i64) -> DomainResult<Vec<Booking>> {
        let mut found: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|b| b.user_id == user_id)
            .map(|b| b.clone())
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn find_stale_pending(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<Booking>> {
        Ok(self
            .bookings
            .iter()
            .filter(|b| b.status == BookingStatus::Pending && b.created_at < cutoff)
            .map(|b| b.clone())
            .collect())
    }
}

// ── Room types ──────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryRoomTypeCatalog {
    room_types: DashMap<i64, RoomType>,
}

impl InMemoryRoomTypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_room_types(room_types: impl IntoIterator<Item = RoomType>) -> Self {
        let catalog = Self::new();
        for rt in room_types {
            catalog.room_types.insert(rt.id, rt);
        }
        catalog
    }
}

#[async_trait]
impl RoomTypeLookup for InMemoryRoomTypeCatalog {
    async fn get_room_type(&self, id: i64) -> DomainResult<Option<RoomType>> {
        Ok(self.room_types.get(&id).map(|rt| rt.clone()))
    }

    async fn list_for_property(&self, property_id: i64) -> DomainResult<Vec<RoomType>> {
        let mut found: Vec<RoomType> = self
            .room_types
            .iter()
            .filter(|rt| rt.property_id == property_id)
            .map(|rt| rt.clone())
            .collect();
        found.sort_by_key(|rt| rt.id);
        Ok(found)
    }

    async fn upsert(&self, room_type: RoomType) -> DomainResult<()> {
        self.room_types.insert(room_type.id, room_type);
        Ok(())
    }
}

// ── Provider ────────────────────────────────────────────────────

/// In-process backend for development and tests
#[derive(Clone)]
pub struct InMemoryRepositoryProvider {
    pub ledger: Arc<InMemoryLedger>,
    pub bookings: Arc<InMemoryBookingRepository>,
    pub room_types: Arc<InMemoryRoomTypeCatalog>,
}

impl InMemoryRepositoryProvider {
    pub fn new() -> Self {
        Self {
            ledger: Arc::new(InMemoryLedger::new()),
            bookings: Arc::new(InMemoryBookingRepository::new()),
            room_types: Arc::new(InMemoryRoomTypeCatalog::new()),
        }
    }
}

impl Default for InMemoryRepositoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl RepositoryProvider for InMemoryRepositoryProvider {
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

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2027, 6, day).unwrap()
    }

    fn scope() -> RoomTypeKey {
        RoomTypeKey::new(1, 10)
    }

    #[tokio::test]
    async fn initialize_twice_is_a_noop() {
        let ledger = InMemoryLedger::new();
        assert_eq!(ledger.initialize_range(scope(), d(1), d(4), 5).await.unwrap(), 3);

        let key = AvailabilityKey::new(scope(), d(2));
        assert!(ledger.conditional_adjust(&key, 2, 2).await.unwrap());

        assert_eq!(ledger.initialize_range(scope(), d(1), d(4), 5).await.unwrap(), 0);
        let rec = ledger.get(&key).await.unwrap().unwrap();
        assert_eq!(rec.available_rooms, 3);
        assert_eq!(ledger.snapshot().len(), 3);
    }

    #[tokio::test]
    async fn conditional_adjust_reports_missing_dates() {
        let ledger = InMemoryLedger::new();
        let err = ledger
            .conditional_adjust(&AvailabilityKey::new(scope(), d(1)), 1, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn conditional_adjust_refuses_to_go_negative() {
        let ledger = InMemoryLedger::new();
        ledger.initialize_range(scope(), d(1), d(2), 1).await.unwrap();
        let key = AvailabilityKey::new(scope(), d(1));

        assert!(ledger.conditional_adjust(&key, 1, 1).await.unwrap());
        assert!(!ledger.conditional_adjust(&key, 1, 1).await.unwrap());
        let rec = ledger.get(&key).await.unwrap().unwrap();
        assert_eq!((rec.available_rooms, rec.booked_rooms, rec.version), (0, 1, 1));
    }

    #[tokio::test]
    async fn stale_snapshot_is_a_version_conflict_and_writes_nothing() {
        let ledger = InMemoryLedger::new();
        ledger.initialize_range(scope(), d(1), d(3), 4).await.unwrap();
        let snapshot = ledger.find_range(scope(), d(1), d(3)).await.unwrap();

        // Someone else books the second night after our read.
        ledger
            .conditional_adjust(&AvailabilityKey::new(scope(), d(2)), 1, 1)
            .await
            .unwrap();

        let outcome = ledger.compare_and_adjust_range(&snapshot, 1).await.unwrap();
        assert_eq!(outcome, RangeAdjustOutcome::VersionConflict);
        let first = ledger
            .get(&AvailabilityKey::new(scope(), d(1)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.available_rooms, 4);
    }

    #[tokio::test]
    async fn insufficient_night_aborts_the_whole_range() {
        let ledger = InMemoryLedger::new();
        ledger.initialize_range(scope(), d(1), d(4), 2).await.unwrap();
        ledger
            .conditional_adjust(&AvailabilityKey::new(scope(), d(3)), 2, 2)
            .await
            .unwrap();
        let snapshot = ledger.find_range(scope(), d(1), d(4)).await.unwrap();

        let outcome = ledger.compare_and_adjust_range(&snapshot, 1).await.unwrap();
        assert_eq!(outcome, RangeAdjustOutcome::Insufficient);
        let nights = ledger.find_range(scope(), d(1), d(3)).await.unwrap();
        assert!(nights.iter().all(|r| r.available_rooms == 2));
    }

    #[tokio::test]
    async fn resize_keeps_counters_consistent() {
        let ledger = InMemoryLedger::new();
        ledger.initialize_range(scope(), d(1), d(3), 5).await.unwrap();
        ledger
            .conditional_adjust(&AvailabilityKey::new(scope(), d(1)), 3, 3)
            .await
            .unwrap();

        assert!(ledger.resize_range(scope(), d(1), d(3), 2).await.is_err());
        assert_eq!(ledger.resize_range(scope(), d(1), d(3), 8).await.unwrap(), 2);
        assert!(ledger.snapshot().iter().all(|r| r.is_consistent()));
        let first = ledger
            .get(&AvailabilityKey::new(scope(), d(1)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!((first.total_rooms, first.available_rooms), (8, 5));
    }

    #[tokio::test]
    async fn delete_range_keeps_booked_nights() {
        let ledger = InMemoryLedger::new();
        ledger.initialize_range(scope(), d(1), d(4), 5).await.unwrap();
        ledger
            .conditional_adjust(&AvailabilityKey::new(scope(), d(2)), 1, 1)
            .await
            .unwrap();

        assert_eq!(ledger.delete_range(scope(), d(1), d(4)).await.unwrap(), 2);
        let left = ledger.find_range(scope(), d(1), d(4)).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].date, d(2));
    }
}
