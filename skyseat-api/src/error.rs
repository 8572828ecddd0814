use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use skyseat_core::ReservationError;

/// Seconds a client should wait before retrying a contended flight.
const RETRY_AFTER_SECS: &str = "1";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Rate limit exceeded")]
    RateLimited,
    #[error(transparent)]
    Reservation(#[from] ReservationError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Reservation(e) => match e {
                ReservationError::FlightNotFound(_) | ReservationError::BookingNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                ReservationError::Forbidden(_) => StatusCode::FORBIDDEN,
                ReservationError::InvalidInventoryRecord { .. }
                | ReservationError::InsufficientInventory { .. }
                | ReservationError::PaymentMismatch { .. }
                | ReservationError::InvalidState(_)
                | ReservationError::FlightNotBookable { .. }
                | ReservationError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                ReservationError::Contention { .. } => StatusCode::CONFLICT,
                ReservationError::InventoryCorruption { .. } | ReservationError::Store(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Internal Server Error: {}", self);
            "Internal Server Error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "success": false,
            "error": message,
        }));

        if matches!(self, AppError::Reservation(ReservationError::Contention { .. })) {
            return (status, [(header::RETRY_AFTER, RETRY_AFTER_SECS)], body).into_response();
        }
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_status_mapping() {
        let id = Uuid::new_v4();
        let cases = [
            (AppError::from(ReservationError::BookingNotFound(id)), StatusCode::NOT_FOUND),
            (AppError::from(ReservationError::Forbidden("no".into())), StatusCode::FORBIDDEN),
            (
                AppError::from(ReservationError::InsufficientInventory { requested: 2, available: 1 }),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::from(ReservationError::Contention { flight_id: id, attempts: 5 }),
                StatusCode::CONFLICT,
            ),
            (
                AppError::from(ReservationError::InventoryCorruption { flight_id: id, detail: "x".into() }),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (AppError::Unauthorized("token".into()), StatusCode::UNAUTHORIZED),
            (AppError::RateLimited, StatusCode::TOO_MANY_REQUESTS),
        ];

        for (error, expected) in cases {
            assert_eq!(error.status(), expected, "{}", error);
        }
    }

    #[test]
    fn test_contention_sets_retry_after() {
        let response = AppError::from(ReservationError::Contention {
            flight_id: Uuid::new_v4(),
            attempts: 5,
        })
        .into_response();
        assert_eq!(response.headers()[header::RETRY_AFTER], RETRY_AFTER_SECS);
    }
}
