//! Room type lookup interface

use async_trait::async_trait;

use super::model::RoomType;
use crate::domain::DomainResult;

/// Read access to the property catalog.
///
/// Implementations report a failing catalog as
/// [`DomainError::UpstreamUnavailable`](crate::shared::DomainError) and an
/// unknown id as `Ok(None)`.
#[async_trait]
pub trait RoomTypeLookup: Send + Sync {
    async fn get_room_type(&self, id: i64) -> DomainResult<Option<RoomType>>;

    /// Room types of one property
    async fn list_for_property(&self, property_id: i64) -> DomainResult<Vec<RoomType>>;

    /// Insert or replace a room type (catalog sync / seeding)
    async fn upsert(&self, room_type: RoomType) -> DomainResult<()>;
}
