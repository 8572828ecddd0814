use serde::Serialize;
use skyseat_core::{Booking, Flight};
use uuid::Uuid;

/// Seat accounting of one flight checked against its ledger.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InventoryReport {
    pub flight_id: Uuid,
    pub total_seats: u32,
    pub seats_available: u32,
    /// Σ passengers over Confirmed bookings.
    pub committed: u32,
    pub confirmed_bookings: usize,
    pub consistent: bool,
}

impl InventoryReport {
    pub fn compute(flight_id: Uuid, flight: &Flight, bookings: &[Booking]) -> Self {
        let committed: u64 = bookings
            .iter()
            .filter(|b| b.flight_id == flight_id)
            .map(|b| u64::from(b.committed_seats()))
            .sum();
        let confirmed_bookings = bookings
            .iter()
            .filter(|b| b.flight_id == flight_id && !b.is_canceled())
            .count();

        let consistent = committed + u64::from(flight.seats_available) == u64::from(flight.total_seats);

        Self {
            flight_id,
            total_seats: flight.total_seats,
            seats_available: flight.seats_available,
            committed: u32::try_from(committed).unwrap_or(u32::MAX),
            confirmed_bookings,
            consistent,
        }
    }

    pub fn describe_drift(&self) -> String {
        format!(
            "seatsAvailable {} but totalSeats {} minus {} committed seats across {} confirmed bookings",
            self.seats_available, self.total_seats, self.committed, self.confirmed_bookings
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use skyseat_core::{BookingStatus, Extras, PaymentSnapshot};

    fn booking(flight_id: Uuid, passengers: u32, status: BookingStatus) -> Booking {
        let mut booking = Booking::confirmed(
            Uuid::new_v4(),
            flight_id,
            passengers,
            Vec::new(),
            Extras::default(),
            PaymentSnapshot { amount: 0.0, currency: "USD".into(), method: "card".into() },
        );
        booking.status = status;
        booking
    }

    #[test]
    fn test_canceled_bookings_do_not_count() {
        let flight_id = Uuid::new_v4();
        let departure = Utc::now();
        let mut flight = Flight::new("SK2", "OSL", "TRD", departure, departure + Duration::hours(1), 80.0, 10);
        flight.seats_available = 7;

        let bookings = vec![
            booking(flight_id, 3, BookingStatus::Confirmed),
            booking(flight_id, 4, BookingStatus::Canceled),
        ];
        let report = InventoryReport::compute(flight_id, &flight, &bookings);
        assert!(report.consistent);
        assert_eq!(report.committed, 3);
        assert_eq!(report.confirmed_bookings, 1);

        flight.seats_available = 5;
        assert!(!InventoryReport::compute(flight_id, &flight, &bookings).consistent);
    }
}
