use axum::{
    extract::{Path, State},
    routing::get,
    Extension, Json, Router,
};
use serde::Serialize;
use skyseat_booking::CascadeReport;
use skyseat_core::repository::{BookingLedger, UserDirectory};
use skyseat_core::{BookingView, Caller, ReservationError, UserSummary};
use tracing::info;
use uuid::Uuid;

use crate::bookings::invalidate_availability;
use crate::error::AppError;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub user: UserSummary,
    pub bookings: Vec<BookingView>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/users/{id}", get(get_user).delete(delete_user))
}

async fn get_user(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<UserProfile>>, AppError> {
    // Ownership is checked before the user's existence is revealed.
    let bookings = state.engine.bookings_for_user(id, &caller).await?;
    let user = state
        .users
        .get_user(id)
        .await
        .map_err(ReservationError::store)?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(ApiResponse::data(UserProfile { user, bookings })))
}

async fn delete_user(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CascadeReport>>, AppError> {
    if !caller.may_act_for(id) {
        return Err(ReservationError::Forbidden("You cannot delete another user".to_string()).into());
    }

    state
        .users
        .get_user(id)
        .await
        .map_err(ReservationError::store)?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let flights: Vec<Uuid> = state
        .store
        .list_by_user(id)
        .await
        .map_err(ReservationError::store)?
        .into_iter()
        .filter(|b| !b.is_canceled())
        .map(|b| b.flight_id)
        .collect();

    let report = state.engine.cancel_all_for_user(id, &caller).await?;
    for flight_id in flights {
        invalidate_availability(&state, flight_id).await;
    }

    let removed = state.users.remove_user(id).await.map_err(ReservationError::store)?;
    if !removed {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    info!("User {} deleted by {} ({} bookings canceled)", id, caller.user_id, report.canceled);
    Ok(Json(ApiResponse::with_message("User deleted", report)))
}
