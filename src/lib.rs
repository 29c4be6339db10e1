//! # Hotel Booking Core
//!
//! Room inventory reservation and dynamic pricing for a hotel booking
//! platform.
//!
//! ## Architecture
//!
//! The project follows Clean Architecture principles:
//!
//! - **domain**: Bookings, room types, the nightly inventory ledger and
//!   the repository traits
//! - **application**: Availability manager, pricing engine, booking
//!   orchestrator and the event bus
//! - **infrastructure**: SeaORM storage and the in-memory backend
//! - **interfaces**: REST API with Swagger documentation
//! - **server**: Wires everything together and owns the shutdown sequence

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig};

// Re-export database types for easy access
pub use infrastructure::{init_database, DatabaseConfig};

// Re-export API router
pub use interfaces::http::create_api_router;

pub use application::events::{create_event_bus, EventBus, SharedEventBus};
