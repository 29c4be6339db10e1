//! Booking entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bookings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub property_id: i64,
    pub user_id: i64,
    pub room_type_id: i64,

    pub check_in: Date,
    pub check_out: Date,

    pub rooms: i32,
    pub guests: i32,

    /// Smallest currency unit
    pub total_amount_cents: i64,
    pub currency: String,

    /// PENDING, CONFIRMED, CANCELLED, COMPLETED, PAYMENT_FAILED, FAILED, EXPIRED
    pub status: String,

    #[sea_orm(unique)]
    pub confirmation_code: String,

    #[sea_orm(nullable, unique)]
    pub idempotency_key: Option<String>,

    #[sea_orm(nullable)]
    pub cancellation_reason: Option<String>,

    #[sea_orm(nullable)]
    pub refund_amount_cents: Option<i64>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,

    #[sea_orm(nullable)]
    pub cancelled_at: Option<DateTimeUtc>,

    pub version: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
