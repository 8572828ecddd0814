use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

use crate::error::{ReservationError, ReservationResult};
use crate::guard::{self, SchemaViolation};

/// Operational status of a flight as published by the flight directory.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum FlightStatus {
    #[default]
    Scheduled,
    Delayed,
    Cancelled,
}

impl FlightStatus {
    pub const ALL: [&'static str; 3] = ["Scheduled", "Delayed", "Cancelled"];

    pub fn as_str(&self) -> &'static str {
        match self {
            FlightStatus::Scheduled => "Scheduled",
            FlightStatus::Delayed => "Delayed",
            FlightStatus::Cancelled => "Cancelled",
        }
    }

    /// Cancelled flights accept no new seats; delayed flights still sell.
    pub fn accepts_bookings(&self) -> bool {
        !matches!(self, FlightStatus::Cancelled)
    }
}

impl fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Amenities {
    #[serde(default)]
    pub wifi: bool,
    #[serde(default)]
    pub meals: bool,
}

/// Typed view of a flight document. Only built from a record that passed the schema guard.
/// Keys follow the stored camelCase document; responses go out as [`FlightSummary`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub price: f64,
    pub total_seats: u32,
    pub seats_available: u32,
    #[serde(default)]
    pub status: FlightStatus,
    #[serde(default)]
    pub amenities: Amenities,
}

impl Flight {
    /// A freshly scheduled flight with every seat available.
    pub fn new(
        flight_number: &str,
        origin: &str,
        destination: &str,
        departure_time: DateTime<Utc>,
        arrival_time: DateTime<Utc>,
        price: f64,
        total_seats: u32,
    ) -> Self {
        Self {
            flight_number: normalize_code(flight_number),
            origin: normalize_code(origin),
            destination: normalize_code(destination),
            departure_time,
            arrival_time,
            price,
            total_seats,
            seats_available: total_seats,
            status: FlightStatus::Scheduled,
            amenities: Amenities::default(),
        }
    }

    /// Seats held by confirmed bookings according to this record.
    pub fn committed_seats(&self) -> u32 {
        self.total_seats.saturating_sub(self.seats_available)
    }

    pub fn to_document(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Flight codes and airport codes are stored upper-cased and trimmed.
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// A flight document as persisted, with its optimistic-concurrency version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlightRecord {
    pub id: Uuid,
    pub version: i64,
    pub document: Value,
}

impl FlightRecord {
    pub fn new(id: Uuid, document: Value) -> Self {
        Self { id, version: 0, document }
    }

    /// Runs the schema guard and decodes the document. Any violation is a hard stop.
    pub fn decode(&self) -> ReservationResult<Flight> {
        let violations = guard::inspect_flight(&self.document);
        if !violations.is_empty() {
            return Err(ReservationError::InvalidInventoryRecord {
                flight_id: self.id,
                violations,
            });
        }

        serde_json::from_value(self.document.clone()).map_err(|e| {
            ReservationError::InvalidInventoryRecord {
                flight_id: self.id,
                violations: vec![SchemaViolation::new("document", e.to_string())],
            }
        })
    }
}

/// Flight fields resolved for display next to a booking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlightSummary {
    pub id: Uuid,
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub price: f64,
    pub seats_available: u32,
    pub status: FlightStatus,
}

impl FlightSummary {
    pub fn new(id: Uuid, flight: &Flight) -> Self {
        Self {
            id,
            flight_number: flight.flight_number.clone(),
            origin: flight.origin.clone(),
            destination: flight.destination.clone(),
            departure_time: flight.departure_time,
            arrival_time: flight.arrival_time,
            price: flight.price,
            seats_available: flight.seats_available,
            status: flight.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample() -> Flight {
        let departure = Utc::now() + Duration::days(3);
        Flight::new(" sk101 ", "jfk", "lhr ", departure, departure + Duration::hours(7), 150.0, 10)
    }

    #[test]
    fn test_new_flight_normalizes_codes() {
        let flight = sample();
        assert_eq!(flight.flight_number, "SK101");
        assert_eq!(flight.origin, "JFK");
        assert_eq!(flight.destination, "LHR");
        assert_eq!(flight.seats_available, 10);
        assert_eq!(flight.committed_seats(), 0);
    }

    #[test]
    fn test_document_uses_camel_case_keys() {
        let doc = sample().to_document().unwrap();
        assert_eq!(doc["flightNumber"], "SK101");
        assert_eq!(doc["seatsAvailable"], 10);
        assert_eq!(doc["status"], "Scheduled");
    }

    #[test]
    fn test_decode_rejects_corrupt_document() {
        let mut doc = sample().to_document().unwrap();
        doc["price"] = serde_json::json!({ "economy": 150 });
        let record = FlightRecord::new(Uuid::new_v4(), doc);

        match record.decode() {
            Err(ReservationError::InvalidInventoryRecord { violations, .. }) => {
                assert!(violations.iter().any(|v| v.field == "price"));
            }
            other => panic!("expected InvalidInventoryRecord, got {:?}", other),
        }
    }

    #[test]
    fn test_cancelled_flights_do_not_accept_bookings() {
        assert!(FlightStatus::Scheduled.accepts_bookings());
        assert!(FlightStatus::Delayed.accepts_bookings());
        assert!(!FlightStatus::Cancelled.accepts_bookings());
    }
}
