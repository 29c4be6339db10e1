//! SeaORM implementation of BookingRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set, SqlErr,
};
use tracing::debug;
use uuid::Uuid;

use crate::domain::{Booking, BookingRepository, BookingStatus, DomainError, DomainResult};
use crate::infrastructure::database::entities::booking;

use super::{db_err, from_cents, to_cents};

pub struct SeaOrmBookingRepository {
    db: DatabaseConnection,
}

impl SeaOrmBookingRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: booking::Model) -> DomainResult<Booking> {
    let status = BookingStatus::parse(&m.status).ok_or_else(|| {
        DomainError::Storage(format!("booking {} has unknown status {}", m.id, m.status))
    })?;
    Ok(Booking {
        id: m.id,
        property_id: m.property_id,
        user_id: m.user_id,
        room_type_id: m.room_type_id,
        check_in: m.check_in,
        check_out: m.check_out,
        rooms: m.rooms,
        guests: m.guests,
        total_amount: from_cents(m.total_amount_cents),
        currency: m.currency,
        status,
        confirmation_code: m.confirmation_code,
        idempotency_key: m.idempotency_key,
        cancellation_reason: m.cancellation_reason,
        refund_amount: m.refund_amount_cents.map(from_cents),
        created_at: m.created_at,
        updated_at: m.updated_at,
        cancelled_at: m.cancelled_at,
        version: m.version,
    })
}

fn domain_to_active(b: &Booking, version: i64) -> DomainResult<booking::ActiveModel> {
    Ok(booking::ActiveModel {
        id: Set(b.id),
        property_id: Set(b.property_id),
        user_id: Set(b.user_id),
        room_type_id: Set(b.room_type_id),
        check_in: Set(b.check_in),
        check_out: Set(b.check_out),
        rooms: Set(b.rooms),
        guests: Set(b.guests),
        total_amount_cents: Set(to_cents(b.total_amount)?),
        currency: Set(b.currency.clone()),
        status: Set(b.status.as_str().to_string()),
        confirmation_code: Set(b.confirmation_code.clone()),
        idempotency_key: Set(b.idempotency_key.clone()),
        cancellation_reason: Set(b.cancellation_reason.clone()),
        refund_amount_cents: Set(b.refund_amount.map(to_cents).transpose()?),
        created_at: Set(b.created_at),
        updated_at: Set(b.updated_at),
        cancelled_at: Set(b.cancelled_at),
        version: Set(version),
    })
}

fn models_to_domain(models: Vec<booking::Model>) -> DomainResult<Vec<Booking>> {
    models.into_iter().map(model_to_domain).collect()
}

// ── BookingRepository impl ──────────────────────────────────────

#[async_trait]
impl BookingRepository for SeaOrmBookingRepository {
    async fn insert(&self, b: &Booking) -> DomainResult<()> {
        debug!("Saving booking: {} ({})", b.id, b.confirmation_code);

        let model = domain_to_active(b, b.version)?;
        booking::Entity::insert(model)
            .exec_without_returning(&self.db)
            .await
            .map_err(|e| match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(msg)) => DomainError::Conflict(msg),
                _ => db_err(e),
            })?;
        Ok(())
    }

    async fn update(&self, b: &Booking) -> DomainResult<Booking> {
        debug!("Updating booking: {} at version {}", b.id, b.version);

        let next_version = b.version + 1;
        let result = booking::Entity::update_many()
            .set(domain_to_active(b, next_version)?)
            .filter(booking::Column::Id.eq(b.id))
            .filter(booking::Column::Version.eq(b.version))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return match self.find_by_id(b.id).await? {
                Some(current) => Err(DomainError::VersionConflict(format!(
                    "booking {} is at version {}, update was based on {}",
                    b.id, current.version, b.version
                ))),
                None => Err(DomainError::not_found("Booking", "id", b.id)),
            };
        }

        let mut stored = b.clone();
        stored.version = next_version;
        Ok(stored)
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Booking>> {
        booking::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(model_to_domain)
            .transpose()
    }

    async fn find_by_idempotency_key(&self, key: &str) -> DomainResult<Option<Booking>> {
        booking::Entity::find()
            .filter(booking::Column::IdempotencyKey.eq(key))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(model_to_domain)
            .transpose()
    }

    async fn find_by_confirmation_code(&self, code: &str) -> DomainResult<Option<Booking>> {
        booking::Entity::find()
            .filter(booking::Column::ConfirmationCode.eq(code))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(model_to_domain)
            .transpose()
    }

    async fn find_by_user(&self, user_id: i64) -> DomainResult<Vec<Booking>> {
        let models = booking::Entity::find()
            .filter(booking::Column::UserId.eq(user_id))
            .order_by_desc(booking::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models_to_domain(models)
    }

    async fn find_stale_pending(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<Booking>> {
        let models = booking::Entity::find()
            .filter(booking::Column::Status.eq(BookingStatus::Pending.as_str()))
            .filter(booking::Column::CreatedAt.lt(cutoff))
            .order_by_asc(booking::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models_to_domain(models)
    }
}
