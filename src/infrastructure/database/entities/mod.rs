//! Database entities module

pub mod availability;
pub mod booking;
pub mod room_type;

pub use availability::Entity as Availability;
pub use booking::Entity as Booking;
pub use room_type::Entity as RoomType;
