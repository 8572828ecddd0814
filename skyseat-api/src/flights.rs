use axum::{
    extract::{Path, State},
    routing::get,
    Extension, Json, Router,
};
use serde::Serialize;
use skyseat_booking::InventoryReport;
use skyseat_core::repository::FlightDirectory;
use skyseat_core::{Caller, FlightSummary, ReservationError};
use tracing::warn;
use uuid::Uuid;

use crate::error::AppError;
use crate::response::ApiResponse;
use crate::state::AppState;

/// Cached counts are advisory and short-lived; commits invalidate them.
const AVAILABILITY_TTL_SECONDS: u64 = 30;

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub flight_id: Uuid,
    pub seats_available: u32,
    pub cached: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/flights/by-number/{code}", get(get_by_number))
        .route("/v1/flights/{id}/availability", get(get_availability))
        .route("/v1/flights/{id}/audit", get(audit_flight))
}

async fn get_by_number(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ApiResponse<FlightSummary>>, AppError> {
    let record = state
        .store
        .find_by_number(&code)
        .await
        .map_err(ReservationError::store)?
        .ok_or_else(|| AppError::NotFound(format!("Flight {} not found", code.trim().to_uppercase())))?;

    let flight = record.decode()?;
    Ok(Json(ApiResponse::data(FlightSummary::new(record.id, &flight))))
}

async fn get_availability(
    State(state): State<AppState>,
    Path(flight_id): Path<Uuid>,
) -> Result<Json<ApiResponse<AvailabilityResponse>>, AppError> {
    if let Some(redis) = &state.redis {
        match redis.get_flight_availability(flight_id).await {
            Ok(Some(seats_available)) => {
                return Ok(Json(ApiResponse::data(AvailabilityResponse {
                    flight_id,
                    seats_available,
                    cached: true,
                })));
            }
            Ok(None) => {}
            Err(e) => warn!("Availability cache read failed for {}: {}", flight_id, e),
        }
    }

    let flight = state
        .store
        .get_flight(flight_id)
        .await
        .map_err(ReservationError::store)?
        .ok_or(ReservationError::FlightNotFound(flight_id))?
        .decode()?;

    if let Some(redis) = &state.redis {
        if let Err(e) = redis
            .set_flight_availability(flight_id, flight.seats_available, AVAILABILITY_TTL_SECONDS)
            .await
        {
            warn!("Availability cache write failed for {}: {}", flight_id, e);
        }
    }

    Ok(Json(ApiResponse::data(AvailabilityResponse {
        flight_id,
        seats_available: flight.seats_available,
        cached: false,
    })))
}

async fn audit_flight(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(flight_id): Path<Uuid>,
) -> Result<Json<ApiResponse<InventoryReport>>, AppError> {
    let report = state.engine.reconcile(flight_id, &caller).await?;
    let message = if report.consistent { "Inventory consistent" } else { "Inventory drift detected" };
    Ok(Json(ApiResponse::with_message(message, report)))
}
