//! Booking HTTP handlers

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use uuid::Uuid;

use super::dto::*;
use crate::application::booking::{BookingService, CreateBookingRequest};
use crate::interfaces::http::common::{domain_error, ApiError, ApiResponse, ApiResult, ValidatedJson};

/// Header accepted as an alternative to `idempotency_key` in the body.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

#[derive(Clone)]
pub struct BookingAppState {
    pub bookings: Arc<BookingService>,
}

type Created = Result<(StatusCode, Json<ApiResponse<BookingDto>>), ApiError>;

fn with_header_key(body: CreateBookingBody, headers: &HeaderMap) -> CreateBookingRequest {
    let mut request = CreateBookingRequest::from(body);
    if request.idempotency_key.is_none() {
        request.idempotency_key = headers
            .get(IDEMPOTENCY_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
    }
    request
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings",
    tag = "Bookings",
    request_body = CreateBookingBody,
    params(("Idempotency-Key" = Option<String>, Header, description = "Deduplicates retried requests")),
    responses(
        (status = 201, description = "Booking confirmed", body = ApiResponse<BookingDto>),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Unknown room type"),
        (status = 409, description = "Not enough rooms, or contended (retryable)"),
        (status = 503, description = "Catalog unavailable")
    )
)]
pub async fn create_booking(
    State(state): State<BookingAppState>,
    headers: HeaderMap,
    ValidatedJson(body): ValidatedJson<CreateBookingBody>,
) -> Created {
    let booking = state
        .bookings
        .create_booking(with_header_key(body, &headers))
        .await
        .map_err(domain_error)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(booking.into()))))
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings/hold",
    tag = "Bookings",
    request_body = CreateBookingBody,
    responses(
        (status = 201, description = "Rooms held pending payment", body = ApiResponse<BookingDto>),
        (status = 409, description = "Not enough rooms, or contended (retryable)")
    )
)]
pub async fn hold_booking(
    State(state): State<BookingAppState>,
    headers: HeaderMap,
    ValidatedJson(body): ValidatedJson<CreateBookingBody>,
) -> Created {
    let booking = state
        .bookings
        .hold_booking(with_header_key(body, &headers))
        .await
        .map_err(domain_error)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(booking.into()))))
}

#[utoipa::path(
    get,
    path = "/api/v1/bookings/{id}",
    tag = "Bookings",
    params(("id" = Uuid, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking", body = ApiResponse<BookingDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_booking(
    State(state): State<BookingAppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<BookingDto> {
    let booking = state.bookings.get_booking(id).await.map_err(domain_error)?;
    Ok(Json(ApiResponse::success(booking.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/bookings/by-code/{code}",
    tag = "Bookings",
    params(("code" = String, Path, description = "Confirmation code, e.g. HB-1A2B3C4D5E")),
    responses(
        (status = 200, description = "Booking", body = ApiResponse<BookingDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_booking_by_code(
    State(state): State<BookingAppState>,
    Path(code): Path<String>,
) -> ApiResult<BookingDto> {
    let booking = state
        .bookings
        .get_booking_by_confirmation(&code)
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(booking.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}/bookings",
    tag = "Bookings",
    params(("user_id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Bookings, newest first", body = ApiResponse<Vec<BookingDto>>)
    )
)]
pub async fn list_user_bookings(
    State(state): State<BookingAppState>,
    Path(user_id): Path<i64>,
) -> ApiResult<Vec<BookingDto>> {
    let bookings = state
        .bookings
        .list_user_bookings(user_id)
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(
        bookings.into_iter().map(Into::into).collect(),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/cancel",
    tag = "Bookings",
    params(("id" = Uuid, Path, description = "Booking ID")),
    request_body = CancelBookingBody,
    responses(
        (status = 200, description = "Cancelled; refund_amount set", body = ApiResponse<BookingDto>),
        (status = 404, description = "Not found"),
        (status = 422, description = "Booking cannot be cancelled in its current state")
    )
)]
pub async fn cancel_booking(
    State(state): State<BookingAppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(body): ValidatedJson<CancelBookingBody>,
) -> ApiResult<BookingDto> {
    let booking = state
        .bookings
        .cancel_booking(id, body.reason)
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(booking.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/confirm",
    tag = "Bookings",
    params(("id" = Uuid, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Payment confirmed", body = ApiResponse<BookingDto>),
        (status = 422, description = "Booking is not pending")
    )
)]
pub async fn confirm_booking(
    State(state): State<BookingAppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<BookingDto> {
    let booking = state.bookings.confirm_booking(id).await.map_err(domain_error)?;
    Ok(Json(ApiResponse::success(booking.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/payment-failed",
    tag = "Bookings",
    params(("id" = Uuid, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Marked failed; rooms released", body = ApiResponse<BookingDto>),
        (status = 422, description = "Booking is not pending")
    )
)]
pub async fn mark_payment_failed(
    State(state): State<BookingAppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<BookingDto> {
    let booking = state
        .bookings
        .mark_payment_failed(id)
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(booking.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/complete",
    tag = "Bookings",
    params(("id" = Uuid, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Stay completed", body = ApiResponse<BookingDto>),
        (status = 422, description = "Booking is not confirmed")
    )
)]
pub async fn complete_booking(
    State(state): State<BookingAppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<BookingDto> {
    let booking = state.bookings.complete_booking(id).await.map_err(domain_error)?;
    Ok(Json(ApiResponse::success(booking.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/extend",
    tag = "Bookings",
    params(("id" = Uuid, Path, description = "Booking ID")),
    request_body = ExtendStayBody,
    responses(
        (status = 200, description = "Stay extended", body = ApiResponse<BookingDto>),
        (status = 409, description = "Added nights not available")
    )
)]
pub async fn extend_stay(
    State(state): State<BookingAppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(body): ValidatedJson<ExtendStayBody>,
) -> ApiResult<BookingDto> {
    let booking = state
        .bookings
        .extend_stay(id, body.new_check_out)
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(booking.into())))
}

#[utoipa::path(
    put,
    path = "/api/v1/bookings/{id}/guests",
    tag = "Bookings",
    params(("id" = Uuid, Path, description = "Booking ID")),
    request_body = ChangeGuestsBody,
    responses(
        (status = 200, description = "Guest count changed", body = ApiResponse<BookingDto>),
        (status = 400, description = "Exceeds room capacity")
    )
)]
pub async fn change_guest_count(
    State(state): State<BookingAppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(body): ValidatedJson<ChangeGuestsBody>,
) -> ApiResult<BookingDto> {
    let booking = state
        .bookings
        .change_guest_count(id, body.guests)
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(booking.into())))
}

#[utoipa::path(
    put,
    path = "/api/v1/bookings/{id}/rooms",
    tag = "Bookings",
    params(("id" = Uuid, Path, description = "Booking ID")),
    request_body = ChangeRoomsBody,
    responses(
        (status = 200, description = "Room count changed", body = ApiResponse<BookingDto>),
        (status = 409, description = "Additional rooms not available")
    )
)]
pub async fn change_room_count(
    State(state): State<BookingAppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(body): ValidatedJson<ChangeRoomsBody>,
) -> ApiResult<BookingDto> {
    let booking = state
        .bookings
        .change_room_count(id, body.rooms)
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(booking.into())))
}
