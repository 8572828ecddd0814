use uuid::Uuid;

use crate::flight::FlightStatus;
use crate::guard::SchemaViolation;

#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error("Flight not found: {0}")]
    FlightNotFound(Uuid),

    #[error("Booking not found: {0}")]
    BookingNotFound(Uuid),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Flight {flight_id} has schema issues: {}", join_violations(.violations))]
    InvalidInventoryRecord {
        flight_id: Uuid,
        violations: Vec<SchemaViolation>,
    },

    #[error("Not enough seats available: requested {requested}, available {available}")]
    InsufficientInventory { requested: u32, available: u32 },

    #[error(
        "Payment amount must equal flight price × passengers: {price} × {passengers} = {expected}. Got: {proposed}"
    )]
    PaymentMismatch {
        price: f64,
        passengers: u32,
        expected: f64,
        proposed: f64,
    },

    #[error("Invalid booking state: {0}")]
    InvalidState(String),

    #[error("Flight {flight_id} is not open for booking (status {status})")]
    FlightNotBookable { flight_id: Uuid, status: FlightStatus },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Flight {flight_id} is busy, gave up after {attempts} attempts")]
    Contention { flight_id: Uuid, attempts: u32 },

    #[error("Inventory corruption on flight {flight_id}: {detail}")]
    InventoryCorruption { flight_id: Uuid, detail: String },

    #[error("Store error: {0}")]
    Store(String),
}

impl ReservationError {
    /// Transient failures a caller may retry with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReservationError::Contention { .. } | ReservationError::Store(_))
    }

    pub fn store(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        ReservationError::Store(err.to_string())
    }
}

pub type ReservationResult<T> = Result<T, ReservationError>;

fn join_violations(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_mismatch_names_expected_amount() {
        let err = ReservationError::PaymentMismatch {
            price: 150.0,
            passengers: 3,
            expected: 450.0,
            proposed: 449.5,
        };
        let message = err.to_string();
        assert!(message.contains("= 450"));
        assert!(message.contains("449.5"));
    }

    #[test]
    fn test_schema_issues_list_every_field() {
        let err = ReservationError::InvalidInventoryRecord {
            flight_id: Uuid::nil(),
            violations: vec![
                SchemaViolation::new("price", "price must be a number >= 0"),
                SchemaViolation::new("status", "bad status"),
            ],
        };
        let message = err.to_string();
        assert!(message.contains("price: price must be a number >= 0"));
        assert!(message.contains("status: bad status"));
    }

    #[test]
    fn test_only_transient_errors_are_retryable() {
        let contention = ReservationError::Contention { flight_id: Uuid::nil(), attempts: 5 };
        assert!(contention.is_retryable());
        assert!(!ReservationError::InvalidState("canceled".into()).is_retryable());
    }
}
