use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use skyseat_booking::{ModifyRequest, ReserveRequest};
use skyseat_core::{BookingView, Caller};
use tracing::warn;
use uuid::Uuid;

use crate::error::AppError;
use crate::response::ApiResponse;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking))
        .route("/v1/bookings/{id}", get(get_booking).put(update_booking))
        .route("/v1/bookings/{id}/cancel", delete(cancel_booking))
}

// ============================================================================
// Handlers
// ============================================================================

async fn create_booking(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<ReserveRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BookingView>>), AppError> {
    let view = state.engine.reserve(&caller, req).await?;
    invalidate_availability(&state, view.booking.flight_id).await;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Booking confirmed", view)),
    ))
}

async fn get_booking(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<BookingView>>, AppError> {
    let view = state.engine.view(id, &caller).await?;
    Ok(Json(ApiResponse::data(view)))
}

async fn update_booking(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
    Json(req): Json<ModifyRequest>,
) -> Result<Json<ApiResponse<BookingView>>, AppError> {
    let view = state.engine.modify(id, &caller, req).await?;
    invalidate_availability(&state, view.booking.flight_id).await;

    Ok(Json(ApiResponse::with_message("Booking updated", view)))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<BookingView>>, AppError> {
    let outcome = state.engine.cancel(id, &caller).await?;

    let message = if outcome.already_canceled {
        "Booking already canceled"
    } else {
        invalidate_availability(&state, outcome.booking.booking.flight_id).await;
        "Booking canceled"
    };
    Ok(Json(ApiResponse::with_message(message, outcome.booking)))
}

/// Drops the cached seat count after a committed change. Best effort.
pub(crate) async fn invalidate_availability(state: &AppState, flight_id: Uuid) {
    if let Some(redis) = &state.redis {
        if let Err(e) = redis.delete_flight_availability(flight_id).await {
            warn!("Failed to invalidate availability cache for {}: {}", flight_id, e);
        }
    }
}
