//! Price quote handler

use axum::extract::{Query, State};
use axum::Json;

use super::dto::*;
use crate::domain::RoomTypeKey;
use crate::interfaces::http::common::{domain_error, ApiResponse, ApiResult};
use crate::interfaces::http::modules::availability::AvailabilityAppState;

#[derive(Clone)]
pub struct PricingAppState {
    pub inner: AvailabilityAppState,
    pub currency: String,
}

#[utoipa::path(
    get,
    path = "/api/v1/pricing/quote",
    tag = "Pricing",
    params(QuoteQuery),
    responses(
        (status = 200, description = "Price breakdown at today's rates", body = ApiResponse<PriceQuoteDto>),
        (status = 400, description = "Invalid dates or room count"),
        (status = 404, description = "Unknown room type")
    )
)]
pub async fn get_quote(
    State(state): State<PricingAppState>,
    Query(q): Query<QuoteQuery>,
) -> ApiResult<PriceQuoteDto> {
    let room_type = state
        .inner
        .availability
        .lookup_room_type(RoomTypeKey::new(q.property_id, q.room_type_id))
        .await
        .map_err(domain_error)?;
    let breakdown = state
        .inner
        .pricing
        .get_price_breakdown(&room_type, q.check_in, q.check_out, q.rooms)
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(PriceQuoteDto::new(
        breakdown,
        state.currency.clone(),
    ))))
}
