//! In-process storage backend

mod memory;

pub use memory::{
    InMemoryBookingRepository, InMemoryLedger, InMemoryRepositoryProvider,
    InMemoryRoomTypeCatalog,
};
