pub mod availability;
pub mod booking;
pub mod events;
pub mod locking;
pub mod pricing;

// Re-export key types for convenience
pub use availability::{AvailabilityConfig, AvailabilityManager};
pub use booking::{
    start_booking_expiry_task, BookingConfig, BookingService, CreateBookingRequest,
};
pub use events::{create_event_bus, EventBus, EventMessage, EventSubscriber, SharedEventBus};
pub use locking::{InProcessLockProvider, LockGuard, LockProvider, SharedLockProvider};
pub use pricing::{OccupancySource, PriceBreakdown, PricingEngine};
