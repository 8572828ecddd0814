use uuid::Uuid;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingConfirmedEvent {
    pub booking_id: Uuid,
    pub flight_id: Uuid,
    pub user_id: Uuid,
    pub passengers: u32,
    pub amount: f64,
    pub currency: String,
    pub seats_available: u32,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingModifiedEvent {
    pub booking_id: Uuid,
    pub flight_id: Uuid,
    pub previous_passengers: u32,
    pub passengers: u32,
    pub seats_available: u32,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingCanceledEvent {
    pub booking_id: Uuid,
    pub flight_id: Uuid,
    pub user_id: Uuid,
    pub released_seats: u32,
    pub seats_available: u32,
    pub timestamp: i64,
}

/// Raised when a flight's seat accounting no longer reconciles with its bookings.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct InventoryAlertEvent {
    pub flight_id: Uuid,
    pub detail: String,
    pub timestamp: i64,
}
