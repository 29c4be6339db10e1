use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::booking::BookingStatus;

#[derive(Debug, Clone, Error)]
pub enum DomainError {
    #[error("Validation: {0}")]
    Validation(String),

    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error(
        "Room type {room_type_id} has fewer than {requested} rooms available between {check_in} and {check_out}"
    )]
    RoomNotAvailable {
        room_type_id: i64,
        check_in: NaiveDate,
        check_out: NaiveDate,
        requested: i32,
    },

    #[error("Concurrent booking conflict: {0}")]
    ConcurrentBookingConflict(String),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Already exists: {0}")]
    Conflict(String),

    /// Optimistic version check failed. Retried inside the availability
    /// manager; callers only ever see `ConcurrentBookingConflict`.
    #[error("Version conflict: {0}")]
    VersionConflict(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, field: &'static str, value: impl ToString) -> Self {
        Self::NotFound {
            entity,
            field,
            value: value.to_string(),
        }
    }

    /// Whether the caller may retry the same request and expect a
    /// different outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConcurrentBookingConflict(_)
                | Self::VersionConflict(_)
                | Self::UpstreamUnavailable(_)
        )
    }
}

impl From<sea_orm::DbErr> for DomainError {
    fn from(e: sea_orm::DbErr) -> Self {
        Self::Storage(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_contention_and_upstream_errors_are_retryable() {
        assert!(DomainError::ConcurrentBookingConflict("lock".into()).is_retryable());
        assert!(DomainError::VersionConflict("v".into()).is_retryable());
        assert!(DomainError::UpstreamUnavailable("catalog".into()).is_retryable());
        assert!(!DomainError::Validation("bad".into()).is_retryable());
        assert!(!DomainError::not_found("Booking", "id", "x").is_retryable());
        assert!(!DomainError::Storage("disk".into()).is_retryable());
    }

    #[test]
    fn not_found_message_names_the_entity() {
        let err = DomainError::not_found("RoomType", "id", 42);
        assert_eq!(err.to_string(), "Not found: RoomType with id=42");
    }
}
