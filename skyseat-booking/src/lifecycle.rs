use skyseat_core::{Booking, Flight, ReservationError, ReservationResult};
use uuid::Uuid;

/// A booking state change together with its effect on the flight's seat count.
///
/// Every transition that touches inventory is applied in the same store
/// transaction as the ledger write that records it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// New Confirmed booking.
    Confirm { passengers: u32 },
    /// Passenger count change on a Confirmed booking.
    Resize { from: u32, to: u32 },
    /// Confirmed → Canceled.
    Cancel { released: u32 },
    Unchanged,
}

impl Transition {
    /// Change applied to the flight's `seatsAvailable`.
    pub fn seat_delta(&self) -> i64 {
        match *self {
            Transition::Confirm { passengers } => -i64::from(passengers),
            Transition::Resize { from, to } => i64::from(from) - i64::from(to),
            Transition::Cancel { released } => i64::from(released),
            Transition::Unchanged => 0,
        }
    }

    /// Whether the transition takes seats away from the flight.
    pub fn consumes_seats(&self) -> bool {
        self.seat_delta() < 0
    }
}

/// Booking state machine: Confirmed → Canceled, terminal.
pub struct BookingLifecycle;

impl BookingLifecycle {
    pub fn confirm(passengers: u32) -> ReservationResult<Transition> {
        if passengers == 0 {
            return Err(ReservationError::InvalidRequest(
                "passengers must be at least 1".to_string(),
            ));
        }
        Ok(Transition::Confirm { passengers })
    }

    pub fn resize(booking: &Booking, to: u32) -> ReservationResult<Transition> {
        Self::ensure_mutable(booking)?;
        if to == 0 {
            return Err(ReservationError::InvalidRequest(
                "passengers must be at least 1".to_string(),
            ));
        }
        if to == booking.passengers {
            return Ok(Transition::Unchanged);
        }
        Ok(Transition::Resize { from: booking.passengers, to })
    }

    /// Canceling twice is a no-op, so seats are credited back exactly once.
    pub fn cancel(booking: &Booking) -> Transition {
        if booking.is_canceled() {
            Transition::Unchanged
        } else {
            Transition::Cancel { released: booking.passengers }
        }
    }

    pub fn ensure_mutable(booking: &Booking) -> ReservationResult<()> {
        if booking.is_canceled() {
            return Err(ReservationError::InvalidState(
                "Canceled bookings cannot be modified".to_string(),
            ));
        }
        Ok(())
    }
}

/// New `seatsAvailable` after applying `delta`, keeping it within `0..=totalSeats`.
///
/// Running short is an ordinary `InsufficientInventory`; overflowing `totalSeats`
/// means the ledger and the seat count already disagree and is reported as
/// corruption rather than clamped.
pub fn apply_seat_delta(flight_id: Uuid, flight: &Flight, delta: i64) -> ReservationResult<u32> {
    let current = i64::from(flight.seats_available);
    let next = current + delta;

    if next < 0 {
        return Err(ReservationError::InsufficientInventory {
            requested: u32::try_from(-delta).unwrap_or(u32::MAX),
            available: flight.seats_available,
        });
    }
    if next > i64::from(flight.total_seats) {
        return Err(ReservationError::InventoryCorruption {
            flight_id,
            detail: format!(
                "crediting {} seats would raise seatsAvailable from {} to {}, above totalSeats {}",
                delta, current, next, flight.total_seats
            ),
        });
    }

    u32::try_from(next).map_err(|_| ReservationError::InventoryCorruption {
        flight_id,
        detail: format!("seat count {} out of range", next),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use skyseat_core::{BookingStatus, Extras, PaymentSnapshot};

    fn flight(total: u32, available: u32) -> Flight {
        let departure = Utc::now() + Duration::days(1);
        let mut flight = Flight::new("SK1", "OSL", "BGO", departure, departure + Duration::hours(1), 100.0, total);
        flight.seats_available = available;
        flight
    }

    fn booking(passengers: u32) -> Booking {
        Booking::confirmed(
            Uuid::new_v4(),
            Uuid::new_v4(),
            passengers,
            Vec::new(),
            Extras::default(),
            PaymentSnapshot { amount: 100.0 * passengers as f64, currency: "USD".into(), method: "card".into() },
        )
    }

    #[test]
    fn test_transition_deltas() {
        assert_eq!(BookingLifecycle::confirm(3).unwrap().seat_delta(), -3);
        assert_eq!(BookingLifecycle::resize(&booking(2), 4).unwrap().seat_delta(), -2);
        assert_eq!(BookingLifecycle::resize(&booking(4), 1).unwrap().seat_delta(), 3);
        assert_eq!(BookingLifecycle::resize(&booking(2), 2).unwrap(), Transition::Unchanged);
        assert_eq!(BookingLifecycle::cancel(&booking(2)).seat_delta(), 2);
    }

    #[test]
    fn test_zero_passengers_rejected() {
        assert!(matches!(BookingLifecycle::confirm(0), Err(ReservationError::InvalidRequest(_))));
        assert!(matches!(
            BookingLifecycle::resize(&booking(2), 0),
            Err(ReservationError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_canceled_is_terminal() {
        let mut canceled = booking(2);
        canceled.status = BookingStatus::Canceled;

        assert_eq!(BookingLifecycle::cancel(&canceled), Transition::Unchanged);
        assert!(matches!(
            BookingLifecycle::resize(&canceled, 3),
            Err(ReservationError::InvalidState(_))
        ));
    }

    #[test]
    fn test_seat_delta_bounds() {
        let id = Uuid::new_v4();
        assert_eq!(apply_seat_delta(id, &flight(10, 5), -5).unwrap(), 0);
        assert_eq!(apply_seat_delta(id, &flight(10, 5), 5).unwrap(), 10);

        match apply_seat_delta(id, &flight(10, 5), -6) {
            Err(ReservationError::InsufficientInventory { requested, available }) => {
                assert_eq!((requested, available), (6, 5));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            apply_seat_delta(id, &flight(10, 9), 2),
            Err(ReservationError::InventoryCorruption { .. })
        ));
    }
}
