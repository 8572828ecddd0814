//! Planner for operator repairs of malformed flight documents.
//!
//! Produces a shallow patch that brings a record back within the schema guard
//! where the intent of the bad data is recoverable. The plan is pure; applying
//! it is up to the caller.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Seat count used when neither seat field is usable.
pub const DEFAULT_TOTAL_SEATS: u64 = 100;
pub const UNKNOWN_CODE: &str = "UNKNOWN";

const PRICE_KEYS: [&str; 3] = ["economy", "amount", "business"];

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct RepairPlan {
    pub updates: Map<String, Value>,
    /// Problems the planner saw but could not fix.
    pub unresolved: Vec<String>,
}

impl RepairPlan {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn apply_to(&self, doc: &mut Value) {
        if let Some(fields) = doc.as_object_mut() {
            for (key, value) in &self.updates {
                fields.insert(key.clone(), value.clone());
            }
        }
    }
}

pub fn plan_repair(doc: &Value, now: DateTime<Utc>) -> RepairPlan {
    let mut plan = RepairPlan::default();
    let empty = Map::new();
    let raw = doc.as_object().unwrap_or(&empty);

    if let Some(Value::Object(prices)) = raw.get("price") {
        let numeric = PRICE_KEYS
            .iter()
            .find_map(|key| prices.get(*key).filter(|v| v.is_number()))
            .or_else(|| prices.values().find(|v| v.is_number()));
        match numeric {
            Some(price) => {
                plan.updates.insert("price".into(), price.clone());
            }
            None => plan
                .unresolved
                .push("price object has no numeric field".to_string()),
        }
    }

    let total = raw.get("totalSeats").and_then(Value::as_u64);
    let available = raw.get("seatsAvailable").and_then(Value::as_u64);
    match (total, available) {
        (Some(total), None) => {
            let fixed = coerce_count(raw.get("seatsAvailable")).unwrap_or(total);
            plan.updates.insert("seatsAvailable".into(), Value::from(fixed));
        }
        (None, Some(available)) => {
            let fixed = coerce_count(raw.get("totalSeats")).unwrap_or(available);
            plan.updates.insert("totalSeats".into(), Value::from(fixed));
        }
        (None, None) => {
            let total = coerce_count(raw.get("totalSeats")).unwrap_or(DEFAULT_TOTAL_SEATS);
            let available = coerce_count(raw.get("seatsAvailable")).unwrap_or(total);
            plan.updates.insert("totalSeats".into(), Value::from(total));
            plan.updates.insert("seatsAvailable".into(), Value::from(available));
        }
        (Some(_), Some(_)) => {}
    }

    for field in ["flightNumber", "origin", "destination"] {
        match raw.get(field) {
            Some(Value::String(s)) if !s.trim().is_empty() => {}
            Some(Value::Number(n)) => {
                plan.updates.insert(field.into(), Value::from(n.to_string()));
            }
            _ => {
                plan.updates.insert(field.into(), Value::from(UNKNOWN_CODE));
            }
        }
    }

    let departure = match parse_time(raw.get("departureTime")) {
        Some(departure) => departure,
        None => {
            if raw.get("departureTime").is_some_and(|v| !v.is_null()) {
                plan.unresolved
                    .push("departureTime is present but unparseable".to_string());
            }
            plan.updates.insert("departureTime".into(), Value::from(format_time(now)));
            now
        }
    };
    if parse_time(raw.get("arrivalTime")).is_none() {
        let arrival = departure + Duration::hours(2);
        plan.updates.insert("arrivalTime".into(), Value::from(format_time(arrival)));
    }

    if let Some(Value::String(status)) = raw.get("status") {
        let normalized = match status.trim().to_lowercase().as_str() {
            "scheduled" => Some("Scheduled"),
            "delayed" => Some("Delayed"),
            "cancelled" | "canceled" => Some("Cancelled"),
            _ => None,
        };
        match normalized {
            Some(fixed) if fixed != status => {
                plan.updates.insert("status".into(), Value::from(fixed));
            }
            Some(_) => {}
            None => plan
                .unresolved
                .push(format!("status {:?} has no known equivalent", status)),
        }
    }

    plan
}

/// Recovers a seat count from a numeric string or an integral float.
fn coerce_count(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n
            .as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
            .map(|f| f as u64),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

fn parse_time(value: Option<&Value>) -> Option<DateTime<Utc>> {
    value
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
}

fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}
