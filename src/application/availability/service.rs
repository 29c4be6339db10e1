//! Availability manager
//!
//! Reserves and releases rooms against the inventory ledger. Reservations
//! take the per-room-type logical lock, then apply one versioned,
//! all-or-nothing adjustment over the stay, retried on version conflicts.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::application::locking::LockProvider;
use crate::domain::{
    AvailabilityKey, CalendarDay, DomainError, DomainResult, InventoryLedger, OverbookingAlert,
    RangeAdjustOutcome, RoomType, RoomTypeKey, RoomTypeLookup, StayRange,
};
use crate::shared::{retry_with_backoff, RetryConfig, RetryError};

/// Nights whose availability rate is below this are reported as at risk.
pub const OVERBOOKING_THRESHOLD: f64 = 0.10;

/// Longest date range accepted by reads, quotes and the bulk operations.
pub const MAX_RANGE_DAYS: i64 = 366;

#[derive(Debug, Clone)]
pub struct AvailabilityConfig {
    pub lock_timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for AvailabilityConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(10),
            retry: RetryConfig::default(),
        }
    }
}

pub struct AvailabilityManager {
    ledger: Arc<dyn InventoryLedger>,
    room_types: Arc<dyn RoomTypeLookup>,
    locks: Arc<dyn LockProvider>,
    config: AvailabilityConfig,
}

impl AvailabilityManager {
    pub fn new(
        ledger: Arc<dyn InventoryLedger>,
        room_types: Arc<dyn RoomTypeLookup>,
        locks: Arc<dyn LockProvider>,
        config: AvailabilityConfig,
    ) -> Self {
        Self {
            ledger,
            room_types,
            locks,
            config,
        }
    }

    /// Reserve `count` rooms on every night of `[check_in, check_out)`.
    ///
    /// `Ok(false)` means some night has fewer than `count` rooms left and
    /// nothing was changed. Lock timeouts and exhausted retries surface as
    /// `ConcurrentBookingConflict`, also with nothing changed.
    pub async fn reserve_rooms(
        &self,
        property_id: i64,
        room_type_id: i64,
        check_in: NaiveDate,
        check_out: NaiveDate,
        count: i32,
    ) -> DomainResult<bool> {
        let stay = StayRange::new(check_in, check_out)?;
        ensure_positive_count(count)?;
        let scope = RoomTypeKey::new(property_id, room_type_id);

        let _guard = self.locks.acquire(scope, self.config.lock_timeout).await?;

        let result = retry_with_backoff(
            &self.config.retry,
            || self.try_reserve(scope, stay, count),
            |e| matches!(e, DomainError::VersionConflict(_)),
            "reserve_rooms",
        )
        .await;

        match result {
            Ok(reserved) => {
                let outcome = if reserved { "reserved" } else { "unavailable" };
                metrics::counter!("availability_reservations_total", "outcome" => outcome)
                    .increment(1);
                if reserved {
                    info!(scope = %scope, %stay, count, "Rooms reserved");
                } else {
                    debug!(scope = %scope, %stay, count, "Not enough rooms");
                }
                Ok(reserved)
            }
            Err(RetryError::Permanent(e)) => Err(e),
            Err(RetryError::Exhausted { attempts, last }) => {
                metrics::counter!("availability_reservations_total", "outcome" => "conflict")
                    .increment(1);
                warn!(scope = %scope, %stay, attempts, error = %last, "Reservation kept conflicting");
                Err(DomainError::ConcurrentBookingConflict(format!(
                    "room type {} still contended after {} attempts",
                    scope, attempts
                )))
            }
        }
    }

    /// One read-check-write pass. A concurrent writer shows up as
    /// `VersionConflict`.
    async fn try_reserve(
        &self,
        scope: RoomTypeKey,
        stay: StayRange,
        count: i32,
    ) -> DomainResult<bool> {
        let nights = stay.nights() as usize;
        let mut records = self
            .ledger
            .find_range(scope, stay.check_in(), stay.check_out())
            .await?;

        if records.len() < nights {
            let room_type = self.lookup_room_type(scope).await?;
            let created = self
                .ledger
                .initialize_range(scope, stay.check_in(), stay.check_out(), room_type.total_rooms)
                .await?;
            debug!(scope = %scope, created, "Initialized missing nights on demand");

            records = self
                .ledger
                .find_range(scope, stay.check_in(), stay.check_out())
                .await?;
            if records.len() < nights {
                return Err(DomainError::VersionConflict(format!(
                    "nights of {} for {} changed during initialization",
                    stay, scope
                )));
            }
        }

        if records.iter().any(|r| r.available_rooms < count) {
            return Ok(false);
        }

        match self.ledger.compare_and_adjust_range(&records, count).await? {
            RangeAdjustOutcome::Applied => Ok(true),
            RangeAdjustOutcome::Insufficient => Ok(false),
            RangeAdjustOutcome::VersionConflict => Err(DomainError::VersionConflict(format!(
                "availability of {} changed during reservation",
                scope
            ))),
        }
    }

    /// Give back `count` rooms on every night of the stay.
    ///
    /// Nights that were never initialized are skipped. No lock is taken:
    /// each night is released by its own conditional update.
    pub async fn release_rooms(
        &self,
        property_id: i64,
        room_type_id: i64,
        check_in: NaiveDate,
        check_out: NaiveDate,
        count: i32,
    ) -> DomainResult<()> {
        let stay = StayRange::new(check_in, check_out)?;
        ensure_positive_count(count)?;
        let scope = RoomTypeKey::new(property_id, room_type_id);

        let mut released = 0;
        for date in stay.dates() {
            let key = AvailabilityKey::new(scope, date);
            match self.ledger.conditional_adjust(&key, -count, 0).await {
                Ok(true) => released += 1,
                Ok(false) => {
                    warn!(key = %key, count, "Release would exceed total rooms, skipped")
                }
                Err(DomainError::NotFound { .. }) => {
                    debug!(key = %key, "No ledger row to release")
                }
                Err(e) => return Err(e),
            }
        }

        info!(scope = %scope, %stay, count, nights = released, "Rooms released");
        Ok(())
    }

    /// Fewest rooms left on any night of the stay. Nights without a ledger
    /// row count as fully available.
    pub async fn get_minimum_availability(
        &self,
        property_id: i64,
        room_type_id: i64,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> DomainResult<i32> {
        ensure_range(check_in, check_out)?;
        let stay = StayRange::new(check_in, check_out)?;
        let scope = RoomTypeKey::new(property_id, room_type_id);

        let records = self.ledger.find_range(scope, check_in, check_out).await?;
        let recorded_min = records.iter().map(|r| r.available_rooms).min();

        if records.len() as i64 == stay.nights() {
            return Ok(recorded_min.unwrap_or(0));
        }

        let total = self.lookup_room_type(scope).await?.total_rooms;
        Ok(recorded_min.map_or(total, |min| min.min(total)))
    }

    /// Per-date availability summed over all room types of the property.
    /// Only dates with ledger rows appear.
    pub async fn get_availability_calendar(
        &self,
        property_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DomainResult<BTreeMap<NaiveDate, CalendarDay>> {
        ensure_range(start, end)?;

        let records = self
            .ledger
            .find_property_range(property_id, start, end)
            .await?;

        let mut sums: BTreeMap<NaiveDate, (i32, i32)> = BTreeMap::new();
        for r in &records {
            let entry = sums.entry(r.date).or_default();
            entry.0 += r.available_rooms;
            entry.1 += r.total_rooms;
        }

        Ok(sums
            .into_iter()
            .map(|(date, (available, total))| (date, CalendarDay::new(available, total)))
            .collect())
    }

    /// Nights that are nearly, but not yet, sold out.
    pub async fn check_overbooking_risk(
        &self,
        property_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DomainResult<Vec<OverbookingAlert>> {
        ensure_range(start, end)?;

        let records = self
            .ledger
            .find_property_range(property_id, start, end)
            .await?;

        Ok(records
            .into_iter()
            .filter(|r| r.total_rooms > 0 && r.available_rooms > 0)
            .filter_map(|r| {
                let rate = f64::from(r.available_rooms) / f64::from(r.total_rooms);
                (rate < OVERBOOKING_THRESHOLD).then(|| OverbookingAlert {
                    property_id: r.property_id,
                    room_type_id: r.room_type_id,
                    date: r.date,
                    available_rooms: r.available_rooms,
                    total_rooms: r.total_rooms,
                    availability_rate: rate,
                })
            })
            .collect())
    }

    /// Create fully available ledger rows for `[start, end)`. Existing rows
    /// are kept as they are. Without `total_rooms` the room type's
    /// configured count is used.
    pub async fn initialize_availability(
        &self,
        property_id: i64,
        room_type_id: i64,
        start: NaiveDate,
        end: NaiveDate,
        total_rooms: Option<i32>,
    ) -> DomainResult<u64> {
        ensure_range(start, end)?;
        let scope = RoomTypeKey::new(property_id, room_type_id);

        let total = match total_rooms {
            Some(t) if t < 0 => {
                return Err(DomainError::Validation(
                    "total_rooms must not be negative".into(),
                ))
            }
            Some(t) => t,
            None => self.lookup_room_type(scope).await?.total_rooms,
        };

        let created = self.ledger.initialize_range(scope, start, end, total).await?;
        info!(scope = %scope, %start, %end, total, created, "Availability initialized");
        Ok(created)
    }

    /// Change the physical room count on existing nights. Refused if any
    /// night already has more bookings than `new_total`.
    pub async fn resize_inventory(
        &self,
        scope: RoomTypeKey,
        start: NaiveDate,
        end: NaiveDate,
        new_total: i32,
    ) -> DomainResult<u64> {
        ensure_range(start, end)?;
        if new_total < 0 {
            return Err(DomainError::Validation(
                "total_rooms must not be negative".into(),
            ));
        }

        let _guard = self.locks.acquire(scope, self.config.lock_timeout).await?;
        let changed = self.ledger.resize_range(scope, start, end, new_total).await?;
        info!(scope = %scope, %start, %end, new_total, changed, "Inventory resized");
        Ok(changed)
    }

    /// Drop ledger rows with no bookings. Nights with bookings are kept.
    pub async fn teardown_inventory(
        &self,
        scope: RoomTypeKey,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DomainResult<u64> {
        ensure_range(start, end)?;

        let _guard = self.locks.acquire(scope, self.config.lock_timeout).await?;
        let deleted = self.ledger.delete_range(scope, start, end).await?;
        info!(scope = %scope, %start, %end, deleted, "Inventory torn down");
        Ok(deleted)
    }

    /// Room type behind `scope`, which must belong to the scoped property.
    /// A failing catalog is reported as `UpstreamUnavailable`.
    pub async fn lookup_room_type(&self, scope: RoomTypeKey) -> DomainResult<RoomType> {
        let room_type = self
            .room_types
            .get_room_type(scope.room_type_id)
            .await
            .map_err(|e| match e {
                DomainError::Storage(msg) => DomainError::UpstreamUnavailable(msg),
                other => other,
            })?
            .ok_or_else(|| DomainError::not_found("RoomType", "id", scope.room_type_id))?;

        if room_type.property_id != scope.property_id {
            return Err(DomainError::not_found("RoomType", "scope", scope));
        }
        Ok(room_type)
    }
}

fn ensure_positive_count(count: i32) -> DomainResult<()> {
    if count < 1 {
        return Err(DomainError::Validation(format!(
            "room count must be at least 1, got {}",
            count
        )));
    }
    Ok(())
}

fn ensure_range(start: NaiveDate, end: NaiveDate) -> DomainResult<()> {
    if end <= start {
        return Err(DomainError::Validation(format!(
            "end date {} must be after start date {}",
            end, start
        )));
    }
    if (end - start).num_days() > MAX_RANGE_DAYS {
        return Err(DomainError::Validation(format!(
            "date range longer than {} days",
            MAX_RANGE_DAYS
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::locking::{InProcessLockProvider, LockGuard};
    use crate::domain::AvailabilityRecord;
    use crate::infrastructure::storage::{InMemoryLedger, InMemoryRepositoryProvider};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use rand::Rng;
    use rust_decimal::Decimal;

    const PROPERTY: i64 = 1;
    const ROOM_TYPE: i64 = 10;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2027, 5, day).unwrap()
    }

    fn room_type(id: i64, total_rooms: i32) -> RoomType {
        RoomType {
            id,
            property_id: PROPERTY,
            name: format!("Type {}", id),
            max_occupancy: 2,
            base_price: Decimal::new(100, 0),
            total_rooms,
        }
    }

    fn fast_config() -> AvailabilityConfig {
        AvailabilityConfig {
            lock_timeout: Duration::from_secs(10),
            retry: RetryConfig {
                max_attempts: 3,
                initial_delay: Duration::from_millis(1),
                backoff_multiplier: 2.0,
                max_delay: Duration::from_millis(5),
            },
        }
    }

    async fn setup(total_rooms: i32) -> (AvailabilityManager, InMemoryRepositoryProvider) {
        setup_with_locks(total_rooms, Arc::new(InProcessLockProvider::new())).await
    }

    async fn setup_with_locks(
        total_rooms: i32,
        locks: Arc<dyn LockProvider>,
    ) -> (AvailabilityManager, InMemoryRepositoryProvider) {
        let repos = InMemoryRepositoryProvider::new();
        repos
            .room_types
            .upsert(room_type(ROOM_TYPE, total_rooms))
            .await
            .unwrap();
        let manager = AvailabilityManager::new(
            repos.ledger.clone(),
            repos.room_types.clone(),
            locks,
            fast_config(),
        );
        (manager, repos)
    }

    #[tokio::test]
    async fn sixth_reservation_is_refused_and_ledger_unchanged() {
        let (manager, repos) = setup(5).await;

        for _ in 0..5 {
            assert!(manager
                .reserve_rooms(PROPERTY, ROOM_TYPE, d(3), d(5), 1)
                .await
                .unwrap());
        }
        let before = repos.ledger.snapshot();

        let sixth = manager
            .reserve_rooms(PROPERTY, ROOM_TYPE, d(3), d(5), 1)
            .await
            .unwrap();
        assert!(!sixth);
        assert_eq!(repos.ledger.snapshot(), before);
        assert!(before.iter().all(|r| r.available_rooms == 0 && r.booked_rooms == 5));
    }

    #[tokio::test]
    async fn invalid_requests_are_rejected_before_touching_the_ledger() {
        let (manager, repos) = setup(5).await;

        assert!(matches!(
            manager.reserve_rooms(PROPERTY, ROOM_TYPE, d(5), d(5), 1).await,
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            manager.reserve_rooms(PROPERTY, ROOM_TYPE, d(5), d(7), 0).await,
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            manager.reserve_rooms(PROPERTY, 999, d(5), d(7), 1).await,
            Err(DomainError::NotFound { .. })
        ));
        assert!(repos.ledger.snapshot().is_empty());
    }

    #[tokio::test]
    async fn initialization_twice_is_a_noop() {
        let (manager, repos) = setup(5).await;

        let first = manager
            .initialize_availability(PROPERTY, ROOM_TYPE, d(1), d(11), None)
            .await
            .unwrap();
        assert_eq!(first, 10);
        manager
            .reserve_rooms(PROPERTY, ROOM_TYPE, d(2), d(3), 2)
            .await
            .unwrap();
        let before = repos.ledger.snapshot();

        let second = manager
            .initialize_availability(PROPERTY, ROOM_TYPE, d(1), d(11), Some(50))
            .await
            .unwrap();
        assert_eq!(second, 0);
        assert_eq!(repos.ledger.snapshot(), before);
    }

    #[tokio::test]
    async fn release_restores_availability_and_ignores_missing_nights() {
        let (manager, _repos) = setup(4).await;

        manager
            .reserve_rooms(PROPERTY, ROOM_TYPE, d(10), d(13), 3)
            .await
            .unwrap();
        assert_eq!(
            manager
                .get_minimum_availability(PROPERTY, ROOM_TYPE, d(10), d(13))
                .await
                .unwrap(),
            1
        );

        // The last two nights were never initialized.
        manager
            .release_rooms(PROPERTY, ROOM_TYPE, d(10), d(15), 3)
            .await
            .unwrap();
        assert_eq!(
            manager
                .get_minimum_availability(PROPERTY, ROOM_TYPE, d(10), d(15))
                .await
                .unwrap(),
            4
        );
    }

    #[tokio::test]
    async fn minimum_availability_counts_missing_nights_as_total() {
        let (manager, _repos) = setup(6).await;
        manager
            .reserve_rooms(PROPERTY, ROOM_TYPE, d(20), d(21), 2)
            .await
            .unwrap();

        let min = manager
            .get_minimum_availability(PROPERTY, ROOM_TYPE, d(19), d(23))
            .await
            .unwrap();
        assert_eq!(min, 4);

        let untouched = manager
            .get_minimum_availability(PROPERTY, ROOM_TYPE, d(25), d(27))
            .await
            .unwrap();
        assert_eq!(untouched, 6);
    }

    #[tokio::test]
    async fn lock_timeout_is_a_conflict_with_ledger_unchanged() {
        let locks = Arc::new(InProcessLockProvider::new());
        let (mut manager, repos) = setup_with_locks(3, locks.clone()).await;
        manager.config.lock_timeout = Duration::from_millis(20);

        let _held = locks
            .acquire(RoomTypeKey::new(PROPERTY, ROOM_TYPE), Duration::from_secs(1))
            .await
            .unwrap();
        let err = manager
            .reserve_rooms(PROPERTY, ROOM_TYPE, d(1), d(3), 1)
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::ConcurrentBookingConflict(_)));
        assert!(err.is_retryable());
        assert!(repos.ledger.snapshot().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_reservations_never_oversell() {
        for _ in 0..5 {
            let (capacity, requests) = {
                let mut rng = rand::thread_rng();
                (rng.gen_range(3..12), rng.gen_range(10..40))
            };
            let (manager, repos) = setup(capacity).await;
            let manager = Arc::new(manager);

            let handles: Vec<_> = (0..requests)
                .map(|_| {
                    let manager = manager.clone();
                    tokio::spawn(async move {
                        manager
                            .reserve_rooms(PROPERTY, ROOM_TYPE, d(7), d(10), 1)
                            .await
                    })
                })
                .collect();

            let mut successes = 0;
            for handle in handles {
                if handle.await.unwrap().unwrap() {
                    successes += 1;
                }
            }

            assert_eq!(successes, requests.min(capacity));
            let records = repos.ledger.snapshot();
            assert_eq!(records.len(), 3);
            for r in records {
                assert!(r.is_consistent());
                assert_eq!(r.booked_rooms, successes);
            }
        }
    }

    /// Delegates to the in-memory ledger, reporting a version conflict on
    /// the first `conflicts` range adjustments.
    struct ContendedLedger {
        inner: Arc<InMemoryLedger>,
        conflicts: AtomicU32,
        adjust_calls: AtomicU32,
    }

    impl ContendedLedger {
        fn new(inner: Arc<InMemoryLedger>, conflicts: u32) -> Self {
            Self {
                inner,
                conflicts: AtomicU32::new(conflicts),
                adjust_calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl InventoryLedger for ContendedLedger {
        async fn get(&self, key: &AvailabilityKey) -> DomainResult<Option<AvailabilityRecord>> {
            self.inner.get(key).await
        }

        async fn find_range(
            &self,
            scope: RoomTypeKey,
            start: NaiveDate,
            end: NaiveDate,
        ) -> DomainResult<Vec<AvailabilityRecord>> {
            self.inner.find_range(scope, start, end).await
        }

        async fn find_property_range(
            &self,
            property_id: i64,
            start: NaiveDate,
            end: NaiveDate,
        ) -> DomainResult<Vec<AvailabilityRecord>> {
            self.inner.find_property_range(property_id, start, end).await
        }

        async fn initialize_range(
            &self,
            scope: RoomTypeKey,
            start: NaiveDate,
            end: NaiveDate,
            total_rooms: i32,
        ) -> DomainResult<u64> {
            self.inner.initialize_range(scope, start, end, total_rooms).await
        }

        async fn conditional_adjust(
            &self,
            key: &AvailabilityKey,
            delta: i32,
            expected_min_available: i32,
        ) -> DomainResult<bool> {
            self.inner
                .conditional_adjust(key, delta, expected_min_available)
                .await
        }

        async fn compare_and_adjust_range(
            &self,
            snapshot: &[AvailabilityRecord],
            delta: i32,
        ) -> DomainResult<RangeAdjustOutcome> {
            self.adjust_calls.fetch_add(1, Ordering::SeqCst);
            let pending = self
                .conflicts
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
            if pending.is_ok() {
                return Ok(RangeAdjustOutcome::VersionConflict);
            }
            self.inner.compare_and_adjust_range(snapshot, delta).await
        }

        async fn resize_range(
            &self,
            scope: RoomTypeKey,
            start: NaiveDate,
            end: NaiveDate,
            new_total: i32,
        ) -> DomainResult<u64> {
            self.inner.resize_range(scope, start, end, new_total).await
        }

        async fn delete_range(
            &self,
            scope: RoomTypeKey,
            start: NaiveDate,
            end: NaiveDate,
        ) -> DomainResult<u64> {
            self.inner.delete_range(scope, start, end).await
        }
    }

    async fn setup_contended(
        conflicts: u32,
    ) -> (AvailabilityManager, Arc<ContendedLedger>, InMemoryRepositoryProvider) {
        let repos = InMemoryRepositoryProvider::new();
        repos
            .room_types
            .upsert(room_type(ROOM_TYPE, 5))
            .await
            .unwrap();
        let ledger = Arc::new(ContendedLedger::new(repos.ledger.clone(), conflicts));
        let manager = AvailabilityManager::new(
            ledger.clone(),
            repos.room_types.clone(),
            Arc::new(InProcessLockProvider::new()),
            fast_config(),
        );
        manager
            .initialize_availability(PROPERTY, ROOM_TYPE, d(1), d(4), None)
            .await
            .unwrap();
        (manager, ledger, repos)
    }

    #[tokio::test]
    async fn version_conflict_is_retried_and_applied_once() {
        let (manager, ledger, repos) = setup_contended(1).await;

        assert!(manager
            .reserve_rooms(PROPERTY, ROOM_TYPE, d(1), d(4), 1)
            .await
            .unwrap());

        assert_eq!(ledger.adjust_calls.load(Ordering::SeqCst), 2);
        let records = repos.ledger.snapshot();
        assert_eq!(records.len(), 3);
        for r in records {
            assert_eq!(r.booked_rooms, 1);
            assert_eq!(r.available_rooms, 4);
        }
    }

    #[tokio::test]
    async fn exhausted_retries_are_a_retryable_conflict_with_ledger_unchanged() {
        let attempts = fast_config().retry.max_attempts;
        let (manager, ledger, repos) = setup_contended(attempts).await;
        let before = repos.ledger.snapshot();

        let err = manager
            .reserve_rooms(PROPERTY, ROOM_TYPE, d(1), d(4), 1)
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::ConcurrentBookingConflict(_)));
        assert!(err.is_retryable());
        assert_eq!(ledger.adjust_calls.load(Ordering::SeqCst), attempts);
        assert_eq!(repos.ledger.snapshot(), before);
    }

    struct NoLocks;

    #[async_trait]
    impl LockProvider for NoLocks {
        async fn acquire(&self, key: RoomTypeKey, _timeout: Duration) -> DomainResult<LockGuard> {
            Ok(LockGuard::unguarded(key))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn ledger_alone_prevents_overselling() {
        let (manager, repos) = setup_with_locks(4, Arc::new(NoLocks)).await;
        manager
            .initialize_availability(PROPERTY, ROOM_TYPE, d(1), d(4), None)
            .await
            .unwrap();
        let manager = Arc::new(manager);

        let handles: Vec<_> = (0..24)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move {
                    manager
                        .reserve_rooms(PROPERTY, ROOM_TYPE, d(1), d(4), 1)
                        .await
                })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(true) => successes += 1,
                Ok(false) | Err(DomainError::ConcurrentBookingConflict(_)) => {}
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert!(successes <= 4);
        for r in repos.ledger.snapshot() {
            assert!(r.is_consistent());
            assert_eq!(r.booked_rooms, successes);
        }
    }

    #[tokio::test]
    async fn calendar_sums_room_types_per_date() {
        let (manager, repos) = setup(4).await;
        repos.room_types.upsert(room_type(11, 6)).await.unwrap();

        manager
            .reserve_rooms(PROPERTY, ROOM_TYPE, d(1), d(3), 2)
            .await
            .unwrap();
        manager
            .reserve_rooms(PROPERTY, 11, d(2), d(3), 3)
            .await
            .unwrap();

        let calendar = manager
            .get_availability_calendar(PROPERTY, d(1), d(5))
            .await
            .unwrap();
        assert_eq!(calendar.len(), 2);
        assert_eq!(calendar[&d(1)], CalendarDay::new(2, 4));
        let second = &calendar[&d(2)];
        assert_eq!((second.available, second.total), (5, 10));
        assert!((second.occupancy_rate - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn overbooking_alerts_skip_sold_out_and_healthy_nights() {
        let (manager, _repos) = setup(20).await;
        manager
            .initialize_availability(PROPERTY, ROOM_TYPE, d(1), d(4), None)
            .await
            .unwrap();
        // Night 1: 1 of 20 left (5 %), night 2: sold out, night 3: 5 left.
        manager.reserve_rooms(PROPERTY, ROOM_TYPE, d(1), d(2), 19).await.unwrap();
        manager.reserve_rooms(PROPERTY, ROOM_TYPE, d(2), d(3), 20).await.unwrap();
        manager.reserve_rooms(PROPERTY, ROOM_TYPE, d(3), d(4), 15).await.unwrap();

        let alerts = manager
            .check_overbooking_risk(PROPERTY, d(1), d(4))
            .await
            .unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].date, d(1));
        assert_eq!(alerts[0].available_rooms, 1);
        assert!((alerts[0].availability_rate - 0.05).abs() < 1e-9);
    }

    #[tokio::test]
    async fn resize_and_teardown_respect_bookings() {
        let (manager, repos) = setup(5).await;
        let scope = RoomTypeKey::new(PROPERTY, ROOM_TYPE);
        manager
            .initialize_availability(PROPERTY, ROOM_TYPE, d(1), d(5), None)
            .await
            .unwrap();
        manager
            .reserve_rooms(PROPERTY, ROOM_TYPE, d(2), d(3), 3)
            .await
            .unwrap();

        assert!(matches!(
            manager.resize_inventory(scope, d(1), d(5), 2).await,
            Err(DomainError::Validation(_))
        ));
        assert_eq!(manager.resize_inventory(scope, d(1), d(5), 7).await.unwrap(), 4);
        assert!(repos.ledger.snapshot().iter().all(|r| r.is_consistent()));

        assert_eq!(manager.teardown_inventory(scope, d(1), d(5)).await.unwrap(), 3);
        let left = repos.ledger.snapshot();
        assert_eq!(left.len(), 1);
        assert_eq!((left[0].date, left[0].available_rooms), (d(2), 4));
    }
}
