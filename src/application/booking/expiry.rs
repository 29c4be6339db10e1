//! Background sweep that expires unpaid PENDING bookings.
//!
//! Runs in a tokio::spawn loop and hands the held rooms back through
//! [`BookingService::expire_stale_bookings`].

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::service::BookingService;
use crate::shared::ShutdownSignal;

/// Start the pending-booking expiry task.
///
/// Stops when `shutdown` is triggered.
pub fn start_booking_expiry_task(
    service: Arc<BookingService>,
    shutdown: ShutdownSignal,
    check_interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            check_interval_secs = check_interval.as_secs(),
            pending_ttl_secs = service.config().pending_ttl.as_secs(),
            "Booking expiry task started"
        );

        let mut interval = tokio::time::interval(check_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match service.expire_stale_bookings().await {
                        Ok(0) => debug!("No stale pending bookings"),
                        Ok(count) => info!(count, "Expired stale pending bookings"),
                        Err(e) => warn!(error = %e, "Booking expiry sweep failed"),
                    }
                }
                _ = shutdown.wait() => {
                    info!("Booking expiry task shutting down");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use crate::application::availability::{AvailabilityConfig, AvailabilityManager};
    use crate::application::booking::{BookingConfig, CreateBookingRequest};
    use crate::application::locking::InProcessLockProvider;
    use crate::application::pricing::PricingEngine;
    use crate::domain::{BookingStatus, NoopEventSink, RoomType, RoomTypeLookup};
    use crate::infrastructure::storage::InMemoryRepositoryProvider;
    use crate::shared::FixedClock;

    #[tokio::test]
    async fn sweep_expires_holds_and_stops_on_shutdown() {
        let repos = InMemoryRepositoryProvider::new();
        repos
            .room_types
            .upsert(RoomType {
                id: 3,
                property_id: 1,
                name: "Suite".into(),
                max_occupancy: 4,
                base_price: Decimal::new(250, 0),
                total_rooms: 2,
            })
            .await
            .unwrap();

        let today = NaiveDate::from_ymd_opt(2027, 5, 3).unwrap();
        let clock = Arc::new(FixedClock::at_date(today));
        let availability = Arc::new(AvailabilityManager::new(
            repos.ledger.clone(),
            repos.room_types.clone(),
            Arc::new(InProcessLockProvider::new()),
            AvailabilityConfig::default(),
        ));
        let pricing = Arc::new(PricingEngine::new(availability.clone(), clock.clone()));
        let service = Arc::new(BookingService::new(
            repos.bookings.clone(),
            repos.room_types.clone(),
            availability.clone(),
            pricing,
            Arc::new(NoopEventSink),
            clock.clone(),
            BookingConfig::default(),
        ));

        let held = service
            .hold_booking(CreateBookingRequest {
                property_id: 1,
                user_id: 9,
                room_type_id: 3,
                check_in: today + chrono::Duration::days(20),
                check_out: today + chrono::Duration::days(22),
                rooms: 2,
                guests: 4,
                idempotency_key: None,
            })
            .await
            .unwrap();
        clock.advance(chrono::Duration::hours(1));

        let shutdown = ShutdownSignal::new();
        let handle =
            start_booking_expiry_task(service.clone(), shutdown.clone(), Duration::from_millis(10));

        let mut status = BookingStatus::Pending;
        for _ in 0..100 {
            status = service.get_booking(held.id).await.unwrap().status;
            if status == BookingStatus::Expired {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(status, BookingStatus::Expired);
        assert_eq!(
            availability
                .get_minimum_availability(1, 3, held.check_in, held.check_out)
                .await
                .unwrap(),
            2
        );

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
