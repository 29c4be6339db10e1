//! API router with Swagger UI

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::FromRef,
    middleware,
    routing::{get, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::application::availability::AvailabilityManager;
use crate::application::booking::BookingService;
use crate::application::pricing::PricingEngine;
use crate::interfaces::http::common::ApiResponse;
use crate::interfaces::http::modules::availability::{self, AvailabilityAppState};
use crate::interfaces::http::modules::bookings::{self, BookingAppState};
use crate::interfaces::http::modules::health::{self, HealthState};
use crate::interfaces::http::modules::metrics::{
    http_metrics_middleware, prometheus_metrics, MetricsState,
};
use crate::interfaces::http::modules::pricing::{self, PricingAppState};
use crate::interfaces::http::modules::request_id::request_id_middleware;

/// Everything the handlers need. Each module extracts its own slice via
/// `FromRef`.
#[derive(Clone)]
pub struct ApiState {
    pub bookings: Arc<BookingService>,
    pub availability: Arc<AvailabilityManager>,
    pub pricing: Arc<PricingEngine>,
    /// Currency stamped on price quotes
    pub currency: String,
    /// Pinged by `/health`; `None` on the in-memory backend
    pub db: Option<DatabaseConnection>,
    pub started_at: Arc<Instant>,
}

impl FromRef<ApiState> for BookingAppState {
    fn from_ref(s: &ApiState) -> Self {
        BookingAppState {
            bookings: Arc::clone(&s.bookings),
        }
    }
}

impl FromRef<ApiState> for AvailabilityAppState {
    fn from_ref(s: &ApiState) -> Self {
        AvailabilityAppState {
            availability: Arc::clone(&s.availability),
            pricing: Arc::clone(&s.pricing),
        }
    }
}

impl FromRef<ApiState> for PricingAppState {
    fn from_ref(s: &ApiState) -> Self {
        PricingAppState {
            inner: AvailabilityAppState::from_ref(s),
            currency: s.currency.clone(),
        }
    }
}

impl FromRef<ApiState> for HealthState {
    fn from_ref(s: &ApiState) -> Self {
        HealthState {
            db: s.db.clone(),
            started_at: Arc::clone(&s.started_at),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        // Bookings
        bookings::create_booking,
        bookings::hold_booking,
        bookings::get_booking,
        bookings::get_booking_by_code,
        bookings::list_user_bookings,
        bookings::cancel_booking,
        bookings::confirm_booking,
        bookings::mark_payment_failed,
        bookings::complete_booking,
        bookings::extend_stay,
        bookings::change_guest_count,
        bookings::change_room_count,
        // Availability
        availability::check_availability,
        availability::initialize_availability,
        availability::resize_inventory,
        availability::teardown_inventory,
        availability::get_calendar,
        availability::get_overbooking_alerts,
        // Pricing
        pricing::get_quote,
    ),
    components(
        schemas(
            ApiResponse<String>,
            health::HealthResponse,
            health::ComponentHealth,
            bookings::BookingDto,
            bookings::CreateBookingBody,
            bookings::CancelBookingBody,
            bookings::ExtendStayBody,
            bookings::ChangeGuestsBody,
            bookings::ChangeRoomsBody,
            availability::AvailabilityResponse,
            availability::InitializeAvailabilityBody,
            availability::ResizeInventoryBody,
            availability::TeardownInventoryBody,
            availability::AffectedDays,
            availability::CalendarDayDto,
            availability::OverbookingAlertDto,
            pricing::PriceQuoteDto,
        )
    ),
    tags(
        (name = "Health", description = "Liveness and database reachability"),
        (name = "Bookings", description = "Create, hold, modify and cancel bookings"),
        (name = "Availability", description = "Room inventory per date and property calendars"),
        (name = "Pricing", description = "Dynamic price quotes"),
    ),
    info(
        title = "Hotel Booking API",
        version = "0.1.0",
        description = "Inventory reservation and dynamic pricing for hotel bookings"
    )
)]
pub struct ApiDoc;

/// Build the full router. `/metrics` is mounted only when a Prometheus
/// handle is given.
pub fn create_api_router(state: ApiState, metrics: Option<PrometheusHandle>) -> Router {
    let booking_routes = Router::new()
        .route("/", post(bookings::create_booking))
        .route("/hold", post(bookings::hold_booking))
        .route("/by-code/{code}", get(bookings::get_booking_by_code))
        .route("/{id}", get(bookings::get_booking))
        .route("/{id}/cancel", post(bookings::cancel_booking))
        .route("/{id}/confirm", post(bookings::confirm_booking))
        .route("/{id}/payment-failed", post(bookings::mark_payment_failed))
        .route("/{id}/complete", post(bookings::complete_booking))
        .route("/{id}/extend", post(bookings::extend_stay))
        .route("/{id}/guests", put(bookings::change_guest_count))
        .route("/{id}/rooms", put(bookings::change_room_count));

    let availability_routes = Router::new()
        .route("/", get(availability::check_availability))
        .route("/initialize", post(availability::initialize_availability))
        .route("/resize", put(availability::resize_inventory))
        .route("/teardown", post(availability::teardown_inventory));

    let property_routes = Router::new()
        .route("/{property_id}/calendar", get(availability::get_calendar))
        .route(
            "/{property_id}/overbooking-alerts",
            get(availability::get_overbooking_alerts),
        );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health::health_check))
        .nest("/api/v1/bookings", booking_routes)
        .nest("/api/v1/availability", availability_routes)
        .nest("/api/v1/properties", property_routes)
        .route("/api/v1/pricing/quote", get(pricing::get_quote))
        .route(
            "/api/v1/users/{user_id}/bookings",
            get(bookings::list_user_bookings),
        )
        .with_state(state);

    if let Some(handle) = metrics {
        router = router.merge(
            Router::new()
                .route("/metrics", get(prometheus_metrics))
                .with_state(MetricsState { handle }),
        );
    }

    router
        .layer(middleware::from_fn(http_metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
