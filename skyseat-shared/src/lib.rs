pub mod models;
pub mod pii;

pub use models::events::{
    BookingCanceledEvent, BookingConfirmedEvent, BookingModifiedEvent, InventoryAlertEvent,
};
pub use pii::Masked;

/// Kafka topics the reservation engine publishes to.
pub mod topics {
    pub const BOOKING_CONFIRMED: &str = "booking.confirmed";
    pub const BOOKING_MODIFIED: &str = "booking.modified";
    pub const BOOKING_CANCELED: &str = "booking.canceled";
    pub const INVENTORY_ALERTS: &str = "inventory.alerts";
}
