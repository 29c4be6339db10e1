//! Booking repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::model::Booking;
use crate::domain::DomainResult;

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Insert a new booking.
    ///
    /// Fails with `DomainError::Conflict` when the idempotency key or the
    /// confirmation code is already taken.
    async fn insert(&self, booking: &Booking) -> DomainResult<()>;

    /// Persist `booking` if the stored row still has `booking.version`.
    /// Returns the stored booking with its version bumped, or
    /// `DomainError::VersionConflict` if someone else updated it first.
    async fn update(&self, booking: &Booking) -> DomainResult<Booking>;

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Booking>>;

    async fn find_by_idempotency_key(&self, key: &str) -> DomainResult<Option<Booking>>;

    async fn find_by_confirmation_code(&self, code: &str) -> DomainResult<Option<Booking>>;

    /// All bookings of a user, newest first
    async fn find_by_user(&self, user_id: i64) -> DomainResult<Vec<Booking>>;

    /// PENDING bookings created before `cutoff`
    async fn find_stale_pending(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<Booking>>;
}
