//! Booking orchestrator
//!
//! Validates requests, reserves inventory through the availability manager,
//! prices the stay, persists the booking and announces every change on the
//! event sink. Inventory is reserved before a booking row exists and handed
//! back whenever the row cannot be written.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::availability::AvailabilityManager;
use crate::application::pricing::{round_money, PricingEngine};
use crate::domain::events::BOOKING_TOPIC;
use crate::domain::{
    Booking, BookingEvent, BookingRepository, BookingStatus, DomainError, DomainResult, EventSink,
    NewBooking, RoomType, RoomTypeLookup, StayRange,
};
use crate::shared::SharedClock;

const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;

#[derive(Debug, Clone)]
pub struct BookingConfig {
    /// Longest stay accepted, in nights
    pub max_stay_nights: i64,
    /// ISO 4217 code stamped on new bookings
    pub currency: String,
    /// How long a PENDING booking may hold inventory
    pub pending_ttl: Duration,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            max_stay_nights: 30,
            currency: "USD".to_string(),
            pending_ttl: Duration::from_secs(15 * 60),
        }
    }
}

/// Request to book rooms of one room type
#[derive(Debug, Clone)]
pub struct CreateBookingRequest {
    pub property_id: i64,
    pub user_id: i64,
    pub room_type_id: i64,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub rooms: i32,
    pub guests: i32,
    /// Repeating a request with the same key returns the first booking
    pub idempotency_key: Option<String>,
}

pub struct BookingService {
    bookings: Arc<dyn BookingRepository>,
    room_types: Arc<dyn RoomTypeLookup>,
    availability: Arc<AvailabilityManager>,
    pricing: Arc<PricingEngine>,
    events: Arc<dyn EventSink>,
    clock: SharedClock,
    config: BookingConfig,
}

impl BookingService {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        room_types: Arc<dyn RoomTypeLookup>,
        availability: Arc<AvailabilityManager>,
        pricing: Arc<PricingEngine>,
        events: Arc<dyn EventSink>,
        clock: SharedClock,
        config: BookingConfig,
    ) -> Self {
        Self {
            bookings,
            room_types,
            availability,
            pricing,
            events,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &BookingConfig {
        &self.config
    }

    // ── Creation ────────────────────────────────────────────────

    /// Reserve, price and store a CONFIRMED booking.
    pub async fn create_booking(&self, request: CreateBookingRequest) -> DomainResult<Booking> {
        self.place(request, BookingStatus::Confirmed).await
    }

    /// Like [`create_booking`](Self::create_booking) but stores the booking
    /// as PENDING until payment is confirmed.
    pub async fn hold_booking(&self, request: CreateBookingRequest) -> DomainResult<Booking> {
        self.place(request, BookingStatus::Pending).await
    }

    async fn place(
        &self,
        request: CreateBookingRequest,
        status: BookingStatus,
    ) -> DomainResult<Booking> {
        if let Some(key) = &request.idempotency_key {
            validate_idempotency_key(key)?;
            if let Some(existing) = self.bookings.find_by_idempotency_key(key).await? {
                info!(booking_id = %existing.id, idempotency_key = %key, "Returning booking for repeated request");
                return Ok(existing);
            }
        }

        let stay = self.validate_stay(request.check_in, request.check_out)?;
        validate_counts(request.rooms, request.guests)?;
        let room_type = self.room_type(request.room_type_id).await?;
        if room_type.property_id != request.property_id {
            return Err(DomainError::Validation(format!(
                "room type {} does not belong to property {}",
                room_type.id, request.property_id
            )));
        }
        ensure_capacity(&room_type, request.rooms, request.guests)?;

        let reserved = self
            .availability
            .reserve_rooms(
                request.property_id,
                request.room_type_id,
                stay.check_in(),
                stay.check_out(),
                request.rooms,
            )
            .await?;
        if !reserved {
            metrics::counter!("bookings_rejected_total", "reason" => "unavailable").increment(1);
            return Err(DomainError::RoomNotAvailable {
                room_type_id: request.room_type_id,
                check_in: stay.check_in(),
                check_out: stay.check_out(),
                requested: request.rooms,
            });
        }

        let total = match self
            .pricing
            .calculate_price(&room_type, stay.check_in(), stay.check_out(), request.rooms)
            .await
        {
            Ok(total) => total,
            Err(e) => {
                self.release_quietly(&request, &stay, request.rooms).await;
                return Err(e);
            }
        };

        let booking = Booking::new(
            NewBooking {
                property_id: request.property_id,
                user_id: request.user_id,
                room_type_id: request.room_type_id,
                stay,
                rooms: request.rooms,
                guests: request.guests,
                total_amount: total,
                currency: self.config.currency.clone(),
                status,
                idempotency_key: request.idempotency_key.clone(),
            },
            self.clock.now(),
        );

        if let Err(e) = self.bookings.insert(&booking).await {
            self.release_quietly(&request, &stay, request.rooms).await;

            // Lost an idempotency race: the winner's booking is the answer.
            if let (DomainError::Conflict(_), Some(key)) = (&e, &request.idempotency_key) {
                if let Some(existing) = self.bookings.find_by_idempotency_key(key).await? {
                    info!(booking_id = %existing.id, idempotency_key = %key, "Concurrent duplicate request resolved");
                    return Ok(existing);
                }
            }
            error!(error = %e, "Failed to store booking, reservation released");
            return Err(e);
        }

        metrics::counter!("bookings_created_total", "status" => status.as_str()).increment(1);
        info!(
            booking_id = %booking.id,
            confirmation_code = %booking.confirmation_code,
            status = %booking.status,
            total = %booking.total_amount,
            "Booking created"
        );
        self.publish(BookingEvent::created(&booking));
        Ok(booking)
    }

    // ── Status changes ──────────────────────────────────────────

    /// Cancel a PENDING or CONFIRMED booking and hand its rooms back.
    ///
    /// Confirmed bookings are refunded by notice period: seven or more days
    /// before check-in in full, three to six days half, less nothing.
    /// Pending bookings were never paid and refund nothing.
    pub async fn cancel_booking(&self, id: Uuid, reason: Option<String>) -> DomainResult<Booking> {
        let mut booking = self.get_booking(id).await?;

        let refund = match booking.status {
            BookingStatus::Confirmed => {
                refund_amount(booking.total_amount, booking.check_in, self.clock.today())
            }
            _ => Decimal::ZERO,
        };
        booking.cancel(reason, refund, self.clock.now())?;

        let stored = self.bookings.update(&booking).await.map_err(contended)?;
        self.release_booking(&stored).await;

        metrics::counter!("bookings_cancelled_total").increment(1);
        info!(booking_id = %stored.id, refund = %refund, "Booking cancelled");
        self.publish(BookingEvent::cancelled(&stored));
        Ok(stored)
    }

    /// PENDING → CONFIRMED once payment succeeded.
    pub async fn confirm_booking(&self, id: Uuid) -> DomainResult<Booking> {
        self.transition(id, BookingStatus::Confirmed).await
    }

    /// PENDING → PAYMENT_FAILED; the held rooms are released.
    pub async fn mark_payment_failed(&self, id: Uuid) -> DomainResult<Booking> {
        self.transition(id, BookingStatus::PaymentFailed).await
    }

    /// CONFIRMED → COMPLETED after the stay.
    pub async fn complete_booking(&self, id: Uuid) -> DomainResult<Booking> {
        self.transition(id, BookingStatus::Completed).await
    }

    async fn transition(&self, id: Uuid, next: BookingStatus) -> DomainResult<Booking> {
        let booking = self.get_booking(id).await?;
        self.apply_transition(booking, next).await
    }

    async fn apply_transition(
        &self,
        mut booking: Booking,
        next: BookingStatus,
    ) -> DomainResult<Booking> {
        let from = booking.status;
        booking.transition_to(next, self.clock.now())?;

        let stored = self.bookings.update(&booking).await.map_err(contended)?;
        if from.holds_inventory() && !next.holds_inventory() {
            self.release_booking(&stored).await;
        }

        info!(booking_id = %stored.id, from = %from, to = %next, "Booking status changed");
        self.publish(BookingEvent::status_changed(&stored, from));
        Ok(stored)
    }

    /// Expire PENDING bookings older than the configured TTL. Returns how
    /// many were expired.
    pub async fn expire_stale_bookings(&self) -> DomainResult<usize> {
        let ttl = chrono::Duration::from_std(self.config.pending_ttl)
            .map_err(|e| DomainError::Validation(format!("pending TTL out of range: {}", e)))?;
        let cutoff = self.clock.now() - ttl;
        let stale = self.bookings.find_stale_pending(cutoff).await?;

        let mut expired = 0;
        for booking in stale {
            let id = booking.id;
            match self.apply_transition(booking, BookingStatus::Expired).await {
                Ok(_) => expired += 1,
                // Confirmed or cancelled while we were looking.
                Err(DomainError::ConcurrentBookingConflict(_))
                | Err(DomainError::InvalidStateTransition { .. }) => {
                    debug!(booking_id = %id, "Pending booking changed before expiry, skipped")
                }
                Err(e) => warn!(booking_id = %id, error = %e, "Failed to expire booking"),
            }
        }

        if expired > 0 {
            metrics::counter!("bookings_expired_total").increment(expired as u64);
        }
        Ok(expired)
    }

    // ── Modifications ───────────────────────────────────────────

    /// Move check-out later, reserving and pricing only the added nights.
    pub async fn extend_stay(&self, id: Uuid, new_check_out: NaiveDate) -> DomainResult<Booking> {
        let booking = self.get_booking(id).await?;
        booking.ensure_modifiable()?;

        if new_check_out <= booking.check_out {
            return Err(DomainError::Validation(format!(
                "new check-out {} must be after current check-out {}",
                new_check_out, booking.check_out
            )));
        }
        self.validate_length(&StayRange::new(booking.check_in, new_check_out)?)?;
        let added = StayRange::new(booking.check_out, new_check_out)?;
        let room_type = self.room_type(booking.room_type_id).await?;

        let reserved = self
            .availability
            .reserve_rooms(
                booking.property_id,
                booking.room_type_id,
                added.check_in(),
                added.check_out(),
                booking.rooms,
            )
            .await?;
        if !reserved {
            return Err(DomainError::RoomNotAvailable {
                room_type_id: booking.room_type_id,
                check_in: added.check_in(),
                check_out: added.check_out(),
                requested: booking.rooms,
            });
        }

        let result = async {
            let extra = self
                .pricing
                .calculate_price(&room_type, added.check_in(), added.check_out(), booking.rooms)
                .await?;
            let mut updated = booking.clone();
            updated.check_out = new_check_out;
            updated.total_amount += extra;
            updated.updated_at = self.clock.now();
            self.bookings.update(&updated).await.map_err(contended)
        }
        .await;

        match result {
            Ok(stored) => {
                info!(booking_id = %stored.id, check_out = %new_check_out, total = %stored.total_amount, "Stay extended");
                self.publish(BookingEvent::modified(&stored, "extend_stay"));
                Ok(stored)
            }
            Err(e) => {
                self.release_range_quietly(&booking, &added, booking.rooms).await;
                Err(e)
            }
        }
    }

    /// Change the number of guests within the capacity of the booked rooms.
    pub async fn change_guest_count(&self, id: Uuid, guests: i32) -> DomainResult<Booking> {
        let booking = self.get_booking(id).await?;
        booking.ensure_modifiable()?;
        validate_counts(booking.rooms, guests)?;

        let room_type = self.room_type(booking.room_type_id).await?;
        ensure_capacity(&room_type, booking.rooms, guests)?;

        let mut updated = booking;
        updated.guests = guests;
        updated.updated_at = self.clock.now();
        let stored = self.bookings.update(&updated).await.map_err(contended)?;

        info!(booking_id = %stored.id, guests, "Guest count changed");
        self.publish(BookingEvent::modified(&stored, "guest_count"));
        Ok(stored)
    }

    /// Add or remove rooms for the whole stay.
    ///
    /// Added rooms are reserved and priced at today's rates; removing rooms
    /// reduces the total pro rata.
    pub async fn change_room_count(&self, id: Uuid, rooms: i32) -> DomainResult<Booking> {
        let booking = self.get_booking(id).await?;
        booking.ensure_modifiable()?;
        validate_counts(rooms, booking.guests)?;
        if rooms == booking.rooms {
            return Ok(booking);
        }

        let room_type = self.room_type(booking.room_type_id).await?;
        ensure_capacity(&room_type, rooms, booking.guests)?;
        let stay = booking.stay()?;
        let delta = rooms - booking.rooms;

        let stored = if delta > 0 {
            let reserved = self
                .availability
                .reserve_rooms(
                    booking.property_id,
                    booking.room_type_id,
                    stay.check_in(),
                    stay.check_out(),
                    delta,
                )
                .await?;
            if !reserved {
                return Err(DomainError::RoomNotAvailable {
                    room_type_id: booking.room_type_id,
                    check_in: stay.check_in(),
                    check_out: stay.check_out(),
                    requested: delta,
                });
            }

            let result = async {
                let extra = self
                    .pricing
                    .calculate_price(&room_type, stay.check_in(), stay.check_out(), delta)
                    .await?;
                let mut updated = booking.clone();
                updated.rooms = rooms;
                updated.total_amount += extra;
                updated.updated_at = self.clock.now();
                self.bookings.update(&updated).await.map_err(contended)
            }
            .await;

            match result {
                Ok(stored) => stored,
                Err(e) => {
                    self.release_range_quietly(&booking, &stay, delta).await;
                    return Err(e);
                }
            }
        } else {
            let mut updated = booking.clone();
            updated.rooms = rooms;
            updated.total_amount = round_money(
                booking.total_amount * Decimal::from(rooms) / Decimal::from(booking.rooms),
            );
            updated.updated_at = self.clock.now();
            let stored = self.bookings.update(&updated).await.map_err(contended)?;
            self.release_range_quietly(&stored, &stay, -delta).await;
            stored
        };

        info!(booking_id = %stored.id, rooms, total = %stored.total_amount, "Room count changed");
        self.publish(BookingEvent::modified(&stored, "room_count"));
        Ok(stored)
    }

    // ── Lookups ─────────────────────────────────────────────────

    pub async fn get_booking(&self, id: Uuid) -> DomainResult<Booking> {
        self.bookings
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Booking", "id", id))
    }

    pub async fn get_booking_by_confirmation(&self, code: &str) -> DomainResult<Booking> {
        self.bookings
            .find_by_confirmation_code(code)
            .await?
            .ok_or_else(|| DomainError::not_found("Booking", "confirmation_code", code))
    }

    pub async fn list_user_bookings(&self, user_id: i64) -> DomainResult<Vec<Booking>> {
        self.bookings.find_by_user(user_id).await
    }

    // ── Helpers ─────────────────────────────────────────────────

    async fn room_type(&self, id: i64) -> DomainResult<RoomType> {
        self.room_types
            .get_room_type(id)
            .await
            .map_err(|e| match e {
                DomainError::Storage(msg) => DomainError::UpstreamUnavailable(msg),
                other => other,
            })?
            .ok_or_else(|| DomainError::not_found("RoomType", "id", id))
    }

    fn validate_stay(&self, check_in: NaiveDate, check_out: NaiveDate) -> DomainResult<StayRange> {
        let stay = StayRange::new(check_in, check_out)?;
        let today = self.clock.today();
        if check_in < today {
            return Err(DomainError::Validation(format!(
                "check-in {} is in the past",
                check_in
            )));
        }
        self.validate_length(&stay)?;
        Ok(stay)
    }

    fn validate_length(&self, stay: &StayRange) -> DomainResult<()> {
        if stay.nights() > self.config.max_stay_nights {
            return Err(DomainError::Validation(format!(
                "stay of {} nights exceeds the maximum of {}",
                stay.nights(),
                self.config.max_stay_nights
            )));
        }
        Ok(())
    }

    async fn release_booking(&self, booking: &Booking) {
        match booking.stay() {
            Ok(stay) => self.release_range_quietly(booking, &stay, booking.rooms).await,
            Err(e) => error!(booking_id = %booking.id, error = %e, "Booking has an invalid stay"),
        }
    }

    async fn release_quietly(&self, request: &CreateBookingRequest, stay: &StayRange, rooms: i32) {
        if let Err(e) = self
            .availability
            .release_rooms(
                request.property_id,
                request.room_type_id,
                stay.check_in(),
                stay.check_out(),
                rooms,
            )
            .await
        {
            error!(error = %e, room_type_id = request.room_type_id, %stay, rooms, "Failed to release reservation");
        }
    }

    async fn release_range_quietly(&self, booking: &Booking, stay: &StayRange, rooms: i32) {
        if let Err(e) = self
            .availability
            .release_rooms(
                booking.property_id,
                booking.room_type_id,
                stay.check_in(),
                stay.check_out(),
                rooms,
            )
            .await
        {
            error!(booking_id = %booking.id, error = %e, %stay, rooms, "Failed to release rooms");
        }
    }

    fn publish(&self, event: BookingEvent) {
        let key = event.booking_id().to_string();
        if let Err(e) = self.events.publish(BOOKING_TOPIC, &key, &event) {
            warn!(event_type = event.event_type(), booking_id = %key, error = %e, "Failed to publish booking event");
        }
    }
}

/// Refund owed for cancelling a paid booking on `today`.
pub fn refund_amount(total: Decimal, check_in: NaiveDate, today: NaiveDate) -> Decimal {
    let days_before = (check_in - today).num_days();
    let share = if days_before >= 7 {
        Decimal::ONE
    } else if days_before >= 3 {
        Decimal::new(5, 1)
    } else {
        Decimal::ZERO
    };
    round_money(total * share)
}

/// Stale booking versions are contention from the caller's point of view.
fn contended(e: DomainError) -> DomainError {
    match e {
        DomainError::VersionConflict(msg) => DomainError::ConcurrentBookingConflict(msg),
        other => other,
    }
}

fn validate_counts(rooms: i32, guests: i32) -> DomainResult<()> {
    if rooms < 1 {
        return Err(DomainError::Validation(
            "at least one room must be booked".into(),
        ));
    }
    if guests < 1 {
        return Err(DomainError::Validation(
            "at least one guest is required".into(),
        ));
    }
    Ok(())
}

fn ensure_capacity(room_type: &RoomType, rooms: i32, guests: i32) -> DomainResult<()> {
    if i64::from(guests) > room_type.capacity_for(rooms) {
        return Err(DomainError::Validation(format!(
            "{} guests exceed the capacity of {} {} room(s)",
            guests, rooms, room_type.name
        )));
    }
    Ok(())
}

fn validate_idempotency_key(key: &str) -> DomainResult<()> {
    if key.trim().is_empty() || key.len() > MAX_IDEMPOTENCY_KEY_LEN {
        return Err(DomainError::Validation(format!(
            "idempotency key must be 1 to {} characters",
            MAX_IDEMPOTENCY_KEY_LEN
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::application::availability::AvailabilityConfig;
    use crate::application::locking::InProcessLockProvider;
    use crate::domain::events::PublishError;
    use crate::domain::{AvailabilityKey, InventoryLedger, RoomTypeKey};
    use crate::infrastructure::storage::InMemoryRepositoryProvider;
    use crate::shared::{FixedClock, RetryConfig};

    const PROPERTY: i64 = 1;
    const ROOM_TYPE: i64 = 10;

    /// March 2027; the 1st is a Monday.
    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2027, 3, day).unwrap()
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<BookingEvent>>,
    }

    impl RecordingSink {
        fn types(&self) -> Vec<&'static str> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .map(|e| e.event_type())
                .collect()
        }
    }

    impl EventSink for RecordingSink {
        fn publish(&self, _: &str, _: &str, event: &BookingEvent) -> Result<(), PublishError> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    struct FailingSink;

    impl EventSink for FailingSink {
        fn publish(&self, _: &str, _: &str, _: &BookingEvent) -> Result<(), PublishError> {
            Err(PublishError::Unavailable("broker down".into()))
        }
    }

    struct Harness {
        service: Arc<BookingService>,
        repos: InMemoryRepositoryProvider,
        clock: Arc<FixedClock>,
        events: Arc<RecordingSink>,
    }

    impl Harness {
        async fn new() -> Self {
            let events = Arc::new(RecordingSink::default());
            Self::with_sink(events.clone(), events).await
        }

        async fn with_sink(sink: Arc<dyn EventSink>, events: Arc<RecordingSink>) -> Self {
            let repos = InMemoryRepositoryProvider::new();
            repos
                .room_types
                .upsert(RoomType {
                    id: ROOM_TYPE,
                    property_id: PROPERTY,
                    name: "Double".into(),
                    max_occupancy: 2,
                    base_price: Decimal::new(100, 0),
                    total_rooms: 5,
                })
                .await
                .unwrap();

            let clock = Arc::new(FixedClock::at_date(d(1)));
            let availability = Arc::new(AvailabilityManager::new(
                repos.ledger.clone(),
                repos.room_types.clone(),
                Arc::new(InProcessLockProvider::new()),
                AvailabilityConfig {
                    lock_timeout: Duration::from_secs(5),
                    retry: RetryConfig {
                        initial_delay: Duration::from_millis(1),
                        ..RetryConfig::default()
                    },
                },
            ));
            let pricing = Arc::new(PricingEngine::new(availability.clone(), clock.clone()));
            let service = Arc::new(BookingService::new(
                repos.bookings.clone(),
                repos.room_types.clone(),
                availability,
                pricing,
                sink,
                clock.clone(),
                BookingConfig::default(),
            ));

            Self {
                service,
                repos,
                clock,
                events,
            }
        }

        async fn booked(&self, day: u32) -> i32 {
            self.repos
                .ledger
                .get(&AvailabilityKey::new(RoomTypeKey::new(PROPERTY, ROOM_TYPE), d(day)))
                .await
                .unwrap()
                .map_or(0, |r| r.booked_rooms)
        }
    }

    fn request(check_in: u32, check_out: u32, rooms: i32) -> CreateBookingRequest {
        CreateBookingRequest {
            property_id: PROPERTY,
            user_id: 42,
            room_type_id: ROOM_TYPE,
            check_in: d(check_in),
            check_out: d(check_out),
            rooms,
            guests: 1,
            idempotency_key: None,
        }
    }

    fn keyed(key: &str) -> CreateBookingRequest {
        CreateBookingRequest {
            idempotency_key: Some(key.into()),
            ..request(15, 17, 1)
        }
    }

    #[tokio::test]
    async fn create_reserves_prices_and_announces() {
        let h = Harness::new().await;
        let b = h.service.create_booking(request(15, 17, 1)).await.unwrap();

        assert_eq!(b.status, BookingStatus::Confirmed);
        assert!(b.confirmation_code.starts_with("HB-"));
        // 2 nights × 100, low demand (4 of 5 left) × 0.80
        assert_eq!(b.total_amount, Decimal::new(16000, 2));
        assert_eq!((h.booked(15).await, h.booked(16).await, h.booked(17).await), (1, 1, 0));
        assert_eq!(h.events.types(), vec!["booking.created"]);
    }

    #[tokio::test]
    async fn repeated_idempotency_key_reserves_once() {
        let h = Harness::new().await;
        let first = h.service.create_booking(keyed("req-7")).await.unwrap();
        let second = h.service.create_booking(keyed("req-7")).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(h.booked(15).await, 1);
        assert_eq!(h.repos.bookings.len(), 1);
        assert_eq!(h.events.types().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_duplicates_resolve_to_one_booking() {
        let h = Harness::new().await;

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let service = h.service.clone();
                tokio::spawn(async move { service.create_booking(keyed("double-click")).await })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().id);
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(h.booked(15).await, 1);
        assert_eq!(h.booked(16).await, 1);
        assert_eq!(h.repos.bookings.len(), 1);
    }

    #[tokio::test]
    async fn invalid_requests_are_rejected() {
        let h = Harness::new().await;
        h.clock.set(d(10).and_hms_opt(12, 0, 0).unwrap().and_utc());

        let past = h.service.create_booking(request(9, 12, 1)).await;
        assert!(matches!(past, Err(DomainError::Validation(_))));

        let too_long = CreateBookingRequest {
            check_out: d(10) + chrono::Duration::days(31),
            ..request(10, 11, 1)
        };
        assert!(matches!(
            h.service.create_booking(too_long).await,
            Err(DomainError::Validation(_))
        ));

        let crowded = CreateBookingRequest {
            guests: 3,
            ..request(12, 13, 1)
        };
        assert!(matches!(
            h.service.create_booking(crowded).await,
            Err(DomainError::Validation(_))
        ));

        let wrong_property = CreateBookingRequest {
            property_id: 2,
            ..request(12, 13, 1)
        };
        assert!(matches!(
            h.service.create_booking(wrong_property).await,
            Err(DomainError::Validation(_))
        ));

        let unknown = CreateBookingRequest {
            room_type_id: 77,
            ..request(12, 13, 1)
        };
        assert!(matches!(
            h.service.create_booking(unknown).await,
            Err(DomainError::NotFound { .. })
        ));

        assert!(matches!(
            h.service.create_booking(request(12, 13, 0)).await,
            Err(DomainError::Validation(_))
        ));
        assert!(h.repos.ledger.snapshot().is_empty());

        // Checking in today is fine.
        assert!(h.service.create_booking(request(10, 11, 1)).await.is_ok());
    }

    #[tokio::test]
    async fn sold_out_stay_is_room_not_available() {
        let h = Harness::new().await;
        let err = h
            .service
            .create_booking(CreateBookingRequest {
                guests: 12,
                ..request(15, 17, 6)
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DomainError::RoomNotAvailable { requested: 6, .. }
        ));
        assert_eq!(h.booked(15).await, 0);
        assert_eq!(h.repos.bookings.len(), 0);
        assert!(h.events.types().is_empty());
    }

    #[tokio::test]
    async fn cancel_restores_inventory_and_refunds_by_notice() {
        let h = Harness::new().await;

        // 10, 5 and 1 days before check-in
        let early = h.service.create_booking(request(11, 12, 1)).await.unwrap();
        let mid = h.service.create_booking(request(6, 7, 1)).await.unwrap();
        let late = h.service.create_booking(request(2, 3, 1)).await.unwrap();

        let early = h.service.cancel_booking(early.id, None).await.unwrap();
        let mid = h
            .service
            .cancel_booking(mid.id, Some("conference moved".into()))
            .await
            .unwrap();
        let late = h.service.cancel_booking(late.id, None).await.unwrap();

        assert_eq!(early.refund_amount, Some(early.total_amount));
        assert_eq!(mid.refund_amount, Some(round_money(mid.total_amount / Decimal::TWO)));
        assert_eq!(late.refund_amount, Some(Decimal::ZERO));
        assert_eq!(mid.cancellation_reason.as_deref(), Some("conference moved"));
        assert!(mid.cancelled_at.is_some());

        for day in [11, 6, 2] {
            assert_eq!(h.booked(day).await, 0);
        }
        assert_eq!(
            h.events.types().iter().filter(|t| **t == "booking.cancelled").count(),
            3
        );
    }

    #[tokio::test]
    async fn cancelling_twice_or_unknown_booking_fails() {
        let h = Harness::new().await;
        let b = h.service.create_booking(request(15, 16, 2)).await.unwrap();
        h.service.cancel_booking(b.id, None).await.unwrap();

        assert!(matches!(
            h.service.cancel_booking(b.id, None).await,
            Err(DomainError::InvalidStateTransition {
                from: BookingStatus::Cancelled,
                to: BookingStatus::Cancelled
            })
        ));
        assert_eq!(h.booked(15).await, 0);

        assert!(matches!(
            h.service.cancel_booking(Uuid::new_v4(), None).await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[test]
    fn refund_bands() {
        let total = Decimal::new(30001, 2);
        assert_eq!(refund_amount(total, d(11), d(1)), total);
        assert_eq!(refund_amount(total, d(8), d(1)), total);
        assert_eq!(refund_amount(total, d(7), d(1)), Decimal::new(15001, 2));
        assert_eq!(refund_amount(total, d(4), d(1)), Decimal::new(15001, 2));
        assert_eq!(refund_amount(total, d(3), d(1)), Decimal::ZERO);
        assert_eq!(refund_amount(total, d(1), d(1)), Decimal::ZERO);
    }

    #[tokio::test]
    async fn hold_then_confirm_or_fail_payment() {
        let h = Harness::new().await;

        let held = h.service.hold_booking(request(15, 17, 2)).await.unwrap();
        assert_eq!(held.status, BookingStatus::Pending);
        assert_eq!(h.booked(15).await, 2);

        let confirmed = h.service.confirm_booking(held.id).await.unwrap();
        assert_eq!(confirmed.status, BookingStatus::Confirmed);
        assert_eq!(confirmed.version, held.version + 1);
        assert_eq!(h.booked(15).await, 2);
        assert!(matches!(
            h.service.confirm_booking(held.id).await,
            Err(DomainError::InvalidStateTransition { .. })
        ));

        let unpaid = h.service.hold_booking(request(15, 17, 1)).await.unwrap();
        let failed = h.service.mark_payment_failed(unpaid.id).await.unwrap();
        assert_eq!(failed.status, BookingStatus::PaymentFailed);
        assert_eq!(h.booked(15).await, 2);

        let done = h.service.complete_booking(confirmed.id).await.unwrap();
        assert_eq!(done.status, BookingStatus::Completed);
        assert_eq!(
            h.events.types(),
            vec![
                "booking.created",
                "booking.status_changed",
                "booking.created",
                "booking.status_changed",
                "booking.status_changed",
            ]
        );
    }

    #[tokio::test]
    async fn cancelling_a_hold_refunds_nothing() {
        let h = Harness::new().await;
        let held = h.service.hold_booking(request(20, 22, 1)).await.unwrap();
        let cancelled = h.service.cancel_booking(held.id, None).await.unwrap();
        assert_eq!(cancelled.refund_amount, Some(Decimal::ZERO));
        assert_eq!(h.booked(20).await, 0);
    }

    #[tokio::test]
    async fn stale_holds_expire_and_release_rooms() {
        let h = Harness::new().await;
        let stale = h.service.hold_booking(request(15, 16, 1)).await.unwrap();
        h.clock.advance(chrono::Duration::minutes(10));
        let fresh = h.service.hold_booking(request(15, 16, 1)).await.unwrap();
        h.clock.advance(chrono::Duration::minutes(10));

        assert_eq!(h.service.expire_stale_bookings().await.unwrap(), 1);
        assert_eq!(
            h.service.get_booking(stale.id).await.unwrap().status,
            BookingStatus::Expired
        );
        assert_eq!(
            h.service.get_booking(fresh.id).await.unwrap().status,
            BookingStatus::Pending
        );
        assert_eq!(h.booked(15).await, 1);
        assert_eq!(h.service.expire_stale_bookings().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn extend_stay_reserves_and_prices_added_nights() {
        let h = Harness::new().await;
        let b = h.service.create_booking(request(15, 17, 1)).await.unwrap();

        let extended = h.service.extend_stay(b.id, d(19)).await.unwrap();
        assert_eq!(extended.check_out, d(19));
        // Wed and Thu nights at the same low-demand rate
        assert_eq!(extended.total_amount, Decimal::new(32000, 2));
        assert_eq!((h.booked(17).await, h.booked(18).await, h.booked(19).await), (1, 1, 0));

        assert!(matches!(
            h.service.extend_stay(b.id, d(18)).await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn failed_extension_leaves_booking_untouched() {
        let h = Harness::new().await;
        let b = h.service.create_booking(request(15, 17, 1)).await.unwrap();
        h.service
            .create_booking(CreateBookingRequest {
                guests: 10,
                ..request(17, 18, 5)
            })
            .await
            .unwrap();

        let err = h.service.extend_stay(b.id, d(18)).await.unwrap_err();
        assert!(matches!(err, DomainError::RoomNotAvailable { .. }));
        assert_eq!(h.service.get_booking(b.id).await.unwrap(), b);
        assert_eq!(h.booked(17).await, 5);
    }

    #[tokio::test]
    async fn room_count_changes_move_only_the_delta() {
        let h = Harness::new().await;
        let b = h.service.create_booking(request(15, 17, 1)).await.unwrap();

        let grown = h.service.change_room_count(b.id, 3).await.unwrap();
        // Two more rooms for two nights at neutral demand (2 of 5 left)
        assert_eq!(grown.total_amount, Decimal::new(56000, 2));
        assert_eq!(h.booked(15).await, 3);

        let shrunk = h.service.change_room_count(b.id, 2).await.unwrap();
        assert_eq!(shrunk.rooms, 2);
        assert_eq!(shrunk.total_amount, Decimal::new(37333, 2));
        assert_eq!(h.booked(16).await, 2);

        let too_many = h.service.change_room_count(b.id, 9).await;
        assert!(matches!(too_many, Err(DomainError::RoomNotAvailable { .. })));
        assert_eq!(h.service.get_booking(b.id).await.unwrap(), shrunk);
    }

    #[tokio::test]
    async fn guest_count_is_bounded_by_capacity() {
        let h = Harness::new().await;
        let b = h.service.create_booking(request(15, 17, 1)).await.unwrap();

        let two = h.service.change_guest_count(b.id, 2).await.unwrap();
        assert_eq!(two.guests, 2);
        assert!(matches!(
            h.service.change_guest_count(b.id, 3).await,
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            h.service.change_guest_count(b.id, 0).await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn modifications_require_a_confirmed_booking() {
        let h = Harness::new().await;
        let b = h.service.create_booking(request(15, 17, 1)).await.unwrap();
        h.service.cancel_booking(b.id, None).await.unwrap();

        assert!(matches!(
            h.service.extend_stay(b.id, d(20)).await,
            Err(DomainError::InvalidStateTransition { .. })
        ));
        assert!(matches!(
            h.service.change_room_count(b.id, 2).await,
            Err(DomainError::InvalidStateTransition { .. })
        ));
        assert_eq!(h.booked(18).await, 0);
    }

    #[tokio::test]
    async fn lookups_by_code_and_user() {
        let h = Harness::new().await;
        let first = h.service.create_booking(request(15, 16, 1)).await.unwrap();
        h.clock.advance(chrono::Duration::seconds(1));
        let second = h.service.create_booking(request(20, 21, 1)).await.unwrap();

        let found = h
            .service
            .get_booking_by_confirmation(&second.confirmation_code)
            .await
            .unwrap();
        assert_eq!(found.id, second.id);
        assert!(matches!(
            h.service.get_booking_by_confirmation("HB-0000000000").await,
            Err(DomainError::NotFound { .. })
        ));

        let mine = h.service.list_user_bookings(42).await.unwrap();
        assert_eq!(
            mine.iter().map(|b| b.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );
        assert!(h.service.list_user_bookings(7).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn publish_failure_does_not_fail_the_booking() {
        let h = Harness::with_sink(Arc::new(FailingSink), Arc::default()).await;
        let b = h.service.create_booking(request(15, 16, 1)).await.unwrap();
        assert_eq!(h.service.get_booking(b.id).await.unwrap().id, b.id);
    }
}
