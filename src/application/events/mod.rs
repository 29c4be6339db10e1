//! Application events (pub/sub)
//!
//! Event types are defined in `domain::events`. The broadcast `EventBus`
//! sink lives here in the application layer.

pub mod event_bus;

pub use event_bus::{create_event_bus, EventBus, EventMessage, EventSubscriber, SharedEventBus};
