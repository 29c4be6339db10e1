//! Availability HTTP handlers

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use rust_decimal::Decimal;

use super::dto::*;
use crate::application::availability::AvailabilityManager;
use crate::application::pricing::{round_money, PricingEngine};
use crate::domain::RoomTypeKey;
use crate::interfaces::http::common::{domain_error, ApiResponse, ApiResult, ValidatedJson};

#[derive(Clone)]
pub struct AvailabilityAppState {
    pub availability: Arc<AvailabilityManager>,
    pub pricing: Arc<PricingEngine>,
}

#[utoipa::path(
    get,
    path = "/api/v1/availability",
    tag = "Availability",
    params(CheckAvailabilityQuery),
    responses(
        (status = 200, description = "Rooms free for the whole stay and the current nightly rate", body = ApiResponse<AvailabilityResponse>),
        (status = 400, description = "Invalid dates"),
        (status = 404, description = "Unknown room type")
    )
)]
pub async fn check_availability(
    State(state): State<AvailabilityAppState>,
    Query(q): Query<CheckAvailabilityQuery>,
) -> ApiResult<AvailabilityResponse> {
    let scope = RoomTypeKey::new(q.property_id, q.room_type_id);
    let room_type = state
        .availability
        .lookup_room_type(scope)
        .await
        .map_err(domain_error)?;

    let available_rooms = state
        .availability
        .get_minimum_availability(q.property_id, q.room_type_id, q.check_in, q.check_out)
        .await
        .map_err(domain_error)?;
    let quote = state
        .pricing
        .get_price_breakdown(&room_type, q.check_in, q.check_out, 1)
        .await
        .map_err(domain_error)?;

    Ok(Json(ApiResponse::success(AvailabilityResponse {
        available_rooms,
        total_rooms: room_type.total_rooms,
        price_per_night: round_money(quote.final_amount / Decimal::from(quote.nights)),
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/availability/initialize",
    tag = "Availability",
    request_body = InitializeAvailabilityBody,
    responses(
        (status = 200, description = "Rows created; dates already initialized are left alone", body = ApiResponse<AffectedDays>),
        (status = 404, description = "Unknown room type")
    )
)]
pub async fn initialize_availability(
    State(state): State<AvailabilityAppState>,
    ValidatedJson(body): ValidatedJson<InitializeAvailabilityBody>,
) -> ApiResult<AffectedDays> {
    let days = state
        .availability
        .initialize_availability(
            body.property_id,
            body.room_type_id,
            body.start_date,
            body.end_date,
            body.total_rooms,
        )
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(AffectedDays { days })))
}

#[utoipa::path(
    put,
    path = "/api/v1/availability/resize",
    tag = "Availability",
    request_body = ResizeInventoryBody,
    responses(
        (status = 200, description = "Nights resized", body = ApiResponse<AffectedDays>),
        (status = 400, description = "A night already has more bookings than the new total")
    )
)]
pub async fn resize_inventory(
    State(state): State<AvailabilityAppState>,
    ValidatedJson(body): ValidatedJson<ResizeInventoryBody>,
) -> ApiResult<AffectedDays> {
    let days = state
        .availability
        .resize_inventory(
            RoomTypeKey::new(body.property_id, body.room_type_id),
            body.start_date,
            body.end_date,
            body.total_rooms,
        )
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(AffectedDays { days })))
}

#[utoipa::path(
    post,
    path = "/api/v1/availability/teardown",
    tag = "Availability",
    request_body = TeardownInventoryBody,
    responses(
        (status = 200, description = "Unbooked nights removed", body = ApiResponse<AffectedDays>)
    )
)]
pub async fn teardown_inventory(
    State(state): State<AvailabilityAppState>,
    ValidatedJson(body): ValidatedJson<TeardownInventoryBody>,
) -> ApiResult<AffectedDays> {
    let days = state
        .availability
        .teardown_inventory(
            RoomTypeKey::new(body.property_id, body.room_type_id),
            body.start_date,
            body.end_date,
        )
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(AffectedDays { days })))
}

#[utoipa::path(
    get,
    path = "/api/v1/properties/{property_id}/calendar",
    tag = "Availability",
    params(("property_id" = i64, Path, description = "Property ID"), DateWindowQuery),
    responses(
        (status = 200, description = "Per-date totals over all room types", body = ApiResponse<Vec<CalendarDayDto>>)
    )
)]
pub async fn get_calendar(
    State(state): State<AvailabilityAppState>,
    Path(property_id): Path<i64>,
    Query(window): Query<DateWindowQuery>,
) -> ApiResult<Vec<CalendarDayDto>> {
    let calendar = state
        .availability
        .get_availability_calendar(property_id, window.start, window.end)
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(
        calendar
            .into_iter()
            .map(|(date, day)| CalendarDayDto::new(date, day))
            .collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/properties/{property_id}/overbooking-alerts",
    tag = "Availability",
    params(("property_id" = i64, Path, description = "Property ID"), DateWindowQuery),
    responses(
        (status = 200, description = "Nights with less than 10 % of rooms left", body = ApiResponse<Vec<OverbookingAlertDto>>)
    )
)]
pub async fn get_overbooking_alerts(
    State(state): State<AvailabilityAppState>,
    Path(property_id): Path<i64>,
    Query(window): Query<DateWindowQuery>,
) -> ApiResult<Vec<OverbookingAlertDto>> {
    let alerts = state
        .availability
        .check_overbooking_risk(property_id, window.start, window.end)
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(
        alerts.into_iter().map(Into::into).collect(),
    )))
}
