//! Structural checks over raw flight documents.
//!
//! Flight records can be edited out of band (data fixes, imports), so the
//! reservation engine re-validates every record it is about to mutate. Seat
//! arithmetic against a malformed record would only compound the damage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::flight::FlightStatus;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaViolation {
    pub field: String,
    pub message: String,
}

impl SchemaViolation {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Returns every structural violation in `doc`; an empty list means the record is usable.
pub fn inspect_flight(doc: &Value) -> Vec<SchemaViolation> {
    let mut violations = Vec::new();

    let Some(fields) = doc.as_object() else {
        violations.push(SchemaViolation::new(
            "document",
            format!("flight record must be an object, got {}", type_name(doc)),
        ));
        return violations;
    };

    for field in ["flightNumber", "origin", "destination"] {
        match fields.get(field) {
            Some(Value::String(s)) if !s.trim().is_empty() => {}
            other => violations.push(SchemaViolation::new(
                field,
                format!("{} is required and must be a string, got {}", field, describe(other)),
            )),
        }
    }

    let departure = timestamp(fields.get("departureTime"), "departureTime", &mut violations);
    let arrival = timestamp(fields.get("arrivalTime"), "arrivalTime", &mut violations);
    if let (Some(departure), Some(arrival)) = (departure, arrival) {
        if arrival <= departure {
            violations.push(SchemaViolation::new(
                "arrivalTime",
                format!("arrivalTime {} must be after departureTime {}", arrival, departure),
            ));
        }
    }

    match fields.get("price") {
        Some(Value::Number(n)) if n.as_f64().is_some_and(|p| p.is_finite() && p >= 0.0) => {}
        other => violations.push(SchemaViolation::new(
            "price",
            format!("price must be a number >= 0, got {}", describe(other)),
        )),
    }

    let total_seats = seat_count(fields.get("totalSeats"), "totalSeats", 1, &mut violations);
    let seats_available =
        seat_count(fields.get("seatsAvailable"), "seatsAvailable", 0, &mut violations);
    if let (Some(total), Some(available)) = (total_seats, seats_available) {
        if available > total {
            violations.push(SchemaViolation::new(
                "seatsAvailable",
                format!("seatsAvailable {} exceeds totalSeats {}", available, total),
            ));
        }
    }

    match fields.get("status") {
        None | Some(Value::Null) => {}
        Some(Value::String(s)) if FlightStatus::ALL.contains(&s.as_str()) => {}
        other => violations.push(SchemaViolation::new(
            "status",
            format!(
                "status must be one of: {}. Got: {}",
                FlightStatus::ALL.join(", "),
                describe(other)
            ),
        )),
    }

    match fields.get("amenities") {
        None | Some(Value::Null) => {}
        Some(Value::Object(flags)) => {
            for (name, flag) in flags {
                if !flag.is_boolean() {
                    violations.push(SchemaViolation::new(
                        "amenities",
                        format!("amenities.{} must be a boolean, got {}", name, describe(Some(flag))),
                    ));
                }
            }
        }
        other => violations.push(SchemaViolation::new(
            "amenities",
            format!("amenities must be an object, got {}", describe(other)),
        )),
    }

    violations
}

fn timestamp(
    value: Option<&Value>,
    field: &str,
    violations: &mut Vec<SchemaViolation>,
) -> Option<DateTime<Utc>> {
    let parsed = value
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc));

    if parsed.is_none() {
        violations.push(SchemaViolation::new(
            field,
            format!("{} is required and must be a valid date, got {}", field, describe(value)),
        ));
    }
    parsed
}

fn seat_count(
    value: Option<&Value>,
    field: &str,
    min: u64,
    violations: &mut Vec<SchemaViolation>,
) -> Option<u64> {
    match value.and_then(Value::as_u64) {
        Some(n) if n >= min && n <= u64::from(u32::MAX) => Some(n),
        _ => {
            violations.push(SchemaViolation::new(
                field,
                format!("{} must be an integer >= {}, got {}", field, min, describe(value)),
            ));
            None
        }
    }
}

fn describe(value: Option<&Value>) -> String {
    match value {
        None => "missing".to_string(),
        Some(v) => format!("{}: {}", type_name(v), v),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
