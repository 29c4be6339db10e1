pub mod availability;
pub mod booking;
pub mod events;
pub mod repositories;
pub mod room_type;
pub mod stay;

// Re-export commonly used types
pub use availability::{
    AvailabilityKey, AvailabilityRecord, CalendarDay, InventoryLedger, OverbookingAlert,
    RangeAdjustOutcome,
};
pub use booking::{Booking, BookingRepository, BookingStatus, NewBooking};
pub use events::{BookingEvent, EventSink, NoopEventSink};
pub use repositories::{DomainResult, RepositoryProvider};
pub use room_type::{RoomType, RoomTypeKey, RoomTypeLookup};
pub use stay::StayRange;

pub use crate::shared::errors::DomainError;
