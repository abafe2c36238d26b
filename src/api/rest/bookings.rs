use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::extract::{ApiJson, BookingId};
use crate::engine::StoreFailurePolicy;
use crate::error::AppError;
use crate::models::booking::{
    Availability, Booking, BookingDraft, BookingPatch, BookingStatus, DriverAssignment,
    Transition, TripDetails,
};
use crate::state::AppState;
use crate::time::{parse_optional, parse_required};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/bookings", get(list_bookings).post(create_booking))
        .route("/api/bookings/check-availability", post(check_availability))
        .route(
            "/api/bookings/:id",
            get(get_booking).put(update_booking).delete(delete_booking),
        )
        .route("/api/bookings/:id/confirm", put(confirm_booking))
        .route("/api/bookings/:id/start", put(start_booking))
        .route("/api/bookings/:id/complete", put(complete_booking))
        .route("/api/bookings/:id/cancel", put(cancel_booking))
        .route("/api/bookings/:id/assign-driver", put(assign_driver))
        .route("/api/bookings/user/:user_id", get(list_by_user))
        .route("/api/bookings/user/:user_id/upcoming", get(list_upcoming_by_user))
        .route("/api/bookings/vehicle/:vehicle_id", get(list_by_vehicle))
        .route("/api/bookings/vehicle/:vehicle_id/active", get(list_active_by_vehicle))
        .route("/api/bookings/status/:status", get(list_by_status))
        .route("/api/bookings/driver/:driver_id", get(list_by_driver))
}

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    fn data(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            message: None,
        })
    }

    fn with_message(data: T, message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
        })
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub user_id: Option<String>,
    pub vehicle_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(flatten)]
    pub details: TripDetails,
}

impl TryFrom<CreateBookingRequest> for BookingDraft {
    type Error = AppError;

    fn try_from(request: CreateBookingRequest) -> Result<Self, Self::Error> {
        Ok(BookingDraft {
            start_date: parse_required("startDate", request.start_date.as_deref())?,
            end_date: parse_required("endDate", request.end_date.as_deref())?,
            user_id: request.user_id.unwrap_or_default(),
            vehicle_id: request.vehicle_id.unwrap_or_default(),
            details: request.details,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookingRequest {
    pub vehicle_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(flatten)]
    pub details: TripDetails,
}

impl TryFrom<UpdateBookingRequest> for BookingPatch {
    type Error = AppError;

    fn try_from(request: UpdateBookingRequest) -> Result<Self, Self::Error> {
        Ok(BookingPatch {
            vehicle_id: request.vehicle_id,
            start_date: parse_optional("startDate", request.start_date.as_deref())?,
            end_date: parse_optional("endDate", request.end_date.as_deref())?,
            details: request.details,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRequest {
    pub vehicle_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

async fn list_bookings(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Booking>> {
    Ok(ApiResponse::data(state.engine.list_all().await?))
}

async fn get_booking(State(state): State<Arc<AppState>>, BookingId(id): BookingId) -> ApiResult<Booking> {
    let booking = state.engine.get(id).await?.ok_or(AppError::NotFound(id))?;
    Ok(ApiResponse::data(booking))
}

async fn list_by_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<Booking>> {
    Ok(ApiResponse::data(state.engine.list_by_user(&user_id).await?))
}

async fn list_upcoming_by_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<Booking>> {
    Ok(ApiResponse::data(
        state.engine.list_upcoming_by_user(&user_id).await?,
    ))
}

async fn list_by_vehicle(
    State(state): State<Arc<AppState>>,
    Path(vehicle_id): Path<String>,
) -> ApiResult<Vec<Booking>> {
    Ok(ApiResponse::data(
        state.engine.list_by_vehicle(&vehicle_id).await?,
    ))
}

async fn list_active_by_vehicle(
    State(state): State<Arc<AppState>>,
    Path(vehicle_id): Path<String>,
) -> ApiResult<Vec<Booking>> {
    Ok(ApiResponse::data(
        state.engine.list_active_by_vehicle(&vehicle_id).await?,
    ))
}

async fn list_by_status(
    State(state): State<Arc<AppState>>,
    Path(status): Path<String>,
) -> ApiResult<Vec<Booking>> {
    let status: BookingStatus = status.parse()?;
    Ok(ApiResponse::data(state.engine.list_by_status(status).await?))
}

async fn list_by_driver(
    State(state): State<Arc<AppState>>,
    Path(driver_id): Path<String>,
) -> ApiResult<Vec<Booking>> {
    let listing = state
        .engine
        .list_by_driver(&driver_id, StoreFailurePolicy::DegradeToEmpty)
        .await?;

    Ok(Json(ApiResponse {
        success: true,
        data: Some(listing.bookings),
        message: listing.note,
    }))
}

async fn check_availability(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<AvailabilityRequest>,
) -> ApiResult<Availability> {
    let vehicle_id = payload.vehicle_id.unwrap_or_default();
    let start = parse_required("startDate", payload.start_date.as_deref())?;
    let end = parse_required("endDate", payload.end_date.as_deref())?;

    let availability = state
        .engine
        .check_availability(&vehicle_id, start, end)
        .await?;
    let message = if availability.available {
        "Vehicle is available for the selected dates"
    } else {
        "Vehicle is not available for the selected dates"
    };

    Ok(ApiResponse::with_message(availability, message))
}

async fn create_booking(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<CreateBookingRequest>,
) -> ApiResult<Booking> {
    let booking = state.engine.create(payload.try_into()?).await?;
    Ok(ApiResponse::with_message(booking, "Booking created successfully"))
}

async fn update_booking(
    State(state): State<Arc<AppState>>,
    BookingId(id): BookingId,
    ApiJson(payload): ApiJson<UpdateBookingRequest>,
) -> ApiResult<Booking> {
    let booking = state.engine.update(id, payload.try_into()?).await?;
    Ok(ApiResponse::with_message(booking, "Booking updated successfully"))
}

async fn delete_booking(State(state): State<Arc<AppState>>, BookingId(id): BookingId) -> ApiResult<Booking> {
    let removed = state.engine.delete(id).await?;
    Ok(ApiResponse::with_message(removed, "Booking deleted successfully"))
}

async fn run_transition(state: &AppState, id: Uuid, transition: Transition, done: &str) -> ApiResult<Booking> {
    let booking = state.engine.transition(id, transition).await?;
    Ok(ApiResponse::with_message(booking, done))
}

async fn confirm_booking(State(state): State<Arc<AppState>>, BookingId(id): BookingId) -> ApiResult<Booking> {
    run_transition(&state, id, Transition::Confirm, "Booking confirmed successfully").await
}

async fn start_booking(State(state): State<Arc<AppState>>, BookingId(id): BookingId) -> ApiResult<Booking> {
    run_transition(&state, id, Transition::Start, "Booking started successfully").await
}

async fn complete_booking(State(state): State<Arc<AppState>>, BookingId(id): BookingId) -> ApiResult<Booking> {
    run_transition(&state, id, Transition::Complete, "Booking completed successfully").await
}

async fn cancel_booking(State(state): State<Arc<AppState>>, BookingId(id): BookingId) -> ApiResult<Booking> {
    run_transition(&state, id, Transition::Cancel, "Booking cancelled successfully").await
}

async fn assign_driver(
    State(state): State<Arc<AppState>>,
    BookingId(id): BookingId,
    ApiJson(payload): ApiJson<DriverAssignment>,
) -> ApiResult<Booking> {
    let booking = state.engine.assign_driver(id, payload).await?;
    Ok(ApiResponse::with_message(
        booking,
        "Driver and route assigned successfully",
    ))
}
