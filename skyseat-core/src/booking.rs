use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::flight::FlightSummary;
use crate::identity::UserSummary;

/// Booking status. `Canceled` is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BookingStatus {
    Confirmed,
    Canceled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "Confirmed",
            BookingStatus::Canceled => "Canceled",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Confirmed" => Ok(BookingStatus::Confirmed),
            "Canceled" => Ok(BookingStatus::Canceled),
            other => Err(format!("unknown booking status: {}", other)),
        }
    }
}

/// Informational passenger record; seat labels are not tracked against the seat map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PassengerDetail {
    pub name: String,
    #[serde(default)]
    pub seat: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Extras {
    #[serde(default)]
    pub baggage: u32,
    #[serde(default)]
    pub meal: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ExtrasPatch {
    pub baggage: Option<u32>,
    pub meal: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentSnapshot {
    pub amount: f64,
    pub currency: String,
    pub method: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PaymentPatch {
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub method: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub flight_id: Uuid,
    pub passengers: u32,
    pub passenger_details: Vec<PassengerDetail>,
    pub extras: Extras,
    pub payment: PaymentSnapshot,
    pub status: BookingStatus,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn confirmed(
        user_id: Uuid,
        flight_id: Uuid,
        passengers: u32,
        passenger_details: Vec<PassengerDetail>,
        extras: Extras,
        payment: PaymentSnapshot,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            flight_id,
            passengers,
            passenger_details,
            extras,
            payment,
            status: BookingStatus::Confirmed,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_canceled(&self) -> bool {
        self.status == BookingStatus::Canceled
    }

    /// Seats this booking holds against its flight's inventory.
    pub fn committed_seats(&self) -> u32 {
        match self.status {
            BookingStatus::Confirmed => self.passengers,
            BookingStatus::Canceled => 0,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// A booking with its flight and owner resolved for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    /// Absent only when the flight record can no longer be decoded.
    pub flight: Option<FlightSummary>,
    pub user: Option<UserSummary>,
}
