//! Dynamic pricing engine

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::factors::{price_stay, PriceBreakdown};
use crate::application::availability::{AvailabilityManager, MAX_RANGE_DAYS};
use crate::domain::{DomainError, DomainResult, RoomType, StayRange};
use crate::shared::SharedClock;

/// Where the engine reads demand from.
#[async_trait]
pub trait OccupancySource: Send + Sync {
    /// Share of rooms sold on the busiest night of the stay, in `[0, 1]`.
    async fn occupancy(&self, room_type: &RoomType, stay: &StayRange) -> DomainResult<f64>;
}

#[async_trait]
impl OccupancySource for AvailabilityManager {
    async fn occupancy(&self, room_type: &RoomType, stay: &StayRange) -> DomainResult<f64> {
        if room_type.total_rooms <= 0 {
            return Ok(0.0);
        }
        let min_available = self
            .get_minimum_availability(
                room_type.property_id,
                room_type.id,
                stay.check_in(),
                stay.check_out(),
            )
            .await?;
        let occupancy = 1.0 - f64::from(min_available) / f64::from(room_type.total_rooms);
        Ok(occupancy.clamp(0.0, 1.0))
    }
}

pub struct PricingEngine {
    occupancy: Arc<dyn OccupancySource>,
    clock: SharedClock,
}

impl PricingEngine {
    pub fn new(occupancy: Arc<dyn OccupancySource>, clock: SharedClock) -> Self {
        Self { occupancy, clock }
    }

    /// Total price for `room_count` rooms over the stay, rounded to cents.
    pub async fn calculate_price(
        &self,
        room_type: &RoomType,
        check_in: NaiveDate,
        check_out: NaiveDate,
        room_count: i32,
    ) -> DomainResult<Decimal> {
        Ok(self
            .get_price_breakdown(room_type, check_in, check_out, room_count)
            .await?
            .final_amount)
    }

    /// Every factor behind [`calculate_price`](Self::calculate_price).
    pub async fn get_price_breakdown(
        &self,
        room_type: &RoomType,
        check_in: NaiveDate,
        check_out: NaiveDate,
        room_count: i32,
    ) -> DomainResult<PriceBreakdown> {
        let stay = StayRange::new(check_in, check_out)?;
        if stay.nights() > MAX_RANGE_DAYS {
            return Err(DomainError::Validation(format!(
                "stay of {} nights exceeds the {} night limit",
                stay.nights(),
                MAX_RANGE_DAYS
            )));
        }
        if room_count < 1 {
            return Err(DomainError::Validation(format!(
                "room count must be at least 1, got {}",
                room_count
            )));
        }

        let occupancy = match self.occupancy.occupancy(room_type, &stay).await {
            Ok(o) => Some(o),
            Err(e) => {
                warn!(room_type_id = room_type.id, %stay, error = %e, "Occupancy unavailable, pricing without demand factor");
                None
            }
        };

        let breakdown = price_stay(room_type, &stay, room_count, self.clock.today(), occupancy);
        debug!(
            room_type_id = room_type.id,
            %stay,
            rooms = room_count,
            total = %breakdown.final_amount,
            "Priced stay"
        );
        Ok(breakdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::FixedClock;

    struct FixedOccupancy(f64);

    #[async_trait]
    impl OccupancySource for FixedOccupancy {
        async fn occupancy(&self, _: &RoomType, _: &StayRange) -> DomainResult<f64> {
            Ok(self.0)
        }
    }

    struct BrokenOccupancy;

    #[async_trait]
    impl OccupancySource for BrokenOccupancy {
        async fn occupancy(&self, _: &RoomType, _: &StayRange) -> DomainResult<f64> {
            Err(DomainError::Storage("ledger offline".into()))
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn room() -> RoomType {
        RoomType {
            id: 4,
            property_id: 1,
            name: "Twin".into(),
            max_occupancy: 2,
            base_price: Decimal::new(100, 0),
            total_rooms: 10,
        }
    }

    fn engine(occupancy: Arc<dyn OccupancySource>) -> PricingEngine {
        PricingEngine::new(occupancy, Arc::new(FixedClock::at_date(d(2026, 12, 15))))
    }

    #[tokio::test]
    async fn price_matches_breakdown_and_repeats() {
        let engine = engine(Arc::new(FixedOccupancy(0.5)));

        let price = engine
            .calculate_price(&room(), d(2027, 3, 15), d(2027, 3, 17), 5)
            .await
            .unwrap();
        let again = engine
            .calculate_price(&room(), d(2027, 3, 15), d(2027, 3, 17), 5)
            .await
            .unwrap();
        let breakdown = engine
            .get_price_breakdown(&room(), d(2027, 3, 15), d(2027, 3, 17), 5)
            .await
            .unwrap();

        assert_eq!(price, Decimal::new(90000, 2));
        assert_eq!(price, again);
        assert_eq!(breakdown.final_amount, price);
    }

    #[tokio::test]
    async fn failed_occupancy_read_prices_neutrally() {
        let engine = engine(Arc::new(BrokenOccupancy));
        let b = engine
            .get_price_breakdown(&room(), d(2027, 3, 15), d(2027, 3, 17), 1)
            .await
            .unwrap();
        assert_eq!(b.occupancy, None);
        assert_eq!(b.demand_factor, Decimal::ONE);
        assert_eq!(b.final_amount, Decimal::new(18000, 2));
    }

    #[tokio::test]
    async fn high_occupancy_raises_price() {
        let engine = engine(Arc::new(FixedOccupancy(0.9)));
        let b = engine
            .get_price_breakdown(&room(), d(2027, 3, 15), d(2027, 3, 17), 1)
            .await
            .unwrap();
        // 200 × 0.90 × 1.40
        assert_eq!(b.final_amount, Decimal::new(25200, 2));
    }

    #[tokio::test]
    async fn rejects_bad_input() {
        let engine = engine(Arc::new(FixedOccupancy(0.5)));
        assert!(engine
            .calculate_price(&room(), d(2027, 3, 17), d(2027, 3, 15), 1)
            .await
            .is_err());
        assert!(engine
            .calculate_price(&room(), d(2027, 3, 15), d(2027, 3, 17), 0)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn stays_longer_than_a_year_are_refused() {
        let engine = engine(Arc::new(FixedOccupancy(0.5)));
        let err = engine
            .get_price_breakdown(&room(), d(2027, 1, 1), d(2099, 1, 1), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let longest = d(2027, 1, 1) + chrono::Duration::days(MAX_RANGE_DAYS);
        assert!(engine
            .get_price_breakdown(&room(), d(2027, 1, 1), longest, 1)
            .await
            .is_ok());
    }
}
