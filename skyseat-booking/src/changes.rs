use serde::Deserialize;
use skyseat_core::payment::PricingPolicy;
use skyseat_core::{
    Booking, Extras, ExtrasPatch, Flight, PassengerDetail, PaymentPatch, PaymentSnapshot,
    ReservationError, ReservationResult,
};

use crate::lifecycle::{BookingLifecycle, Transition};

/// Requested changes to a Confirmed booking. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModifyRequest {
    #[serde(default)]
    pub passengers: Option<u32>,
    #[serde(default)]
    pub passenger_details: Option<Vec<PassengerDetail>>,
    #[serde(default)]
    pub extras: Option<ExtrasPatch>,
    #[serde(default)]
    pub payment: Option<PaymentPatch>,
}

/// Applies booking modifications
pub struct ChangeHandler;

impl ChangeHandler {
    /// Seat transition implied by the request, before anything is written.
    pub fn transition(booking: &Booking, request: &ModifyRequest) -> ReservationResult<Transition> {
        BookingLifecycle::ensure_mutable(booking)?;
        match request.passengers {
            Some(to) => BookingLifecycle::resize(booking, to),
            None => Ok(Transition::Unchanged),
        }
    }

    /// Rewrites `booking` in place. Passenger details are replaced wholesale,
    /// extras and payment are shallow-merged, and the fare is re-checked against
    /// the flight's current price.
    pub fn apply(
        booking: &mut Booking,
        request: &ModifyRequest,
        flight: &Flight,
        pricing: &PricingPolicy,
    ) -> ReservationResult<()> {
        BookingLifecycle::ensure_mutable(booking)?;

        let previous = booking.passengers;
        let passengers = request.passengers.unwrap_or(previous);

        let mut payment = match &request.payment {
            Some(patch) => Self::merge_payment(&booking.payment, patch),
            None => booking.payment.clone(),
        };
        let expected = pricing.expected(flight.price, passengers);
        match request.payment.as_ref().and_then(|p| p.amount) {
            Some(proposed) if !pricing.validate(expected, proposed) => {
                return Err(ReservationError::PaymentMismatch {
                    price: flight.price,
                    passengers,
                    expected,
                    proposed,
                });
            }
            Some(_) => {}
            None if passengers != previous => payment.amount = expected,
            None => {}
        }

        booking.passengers = passengers;
        if let Some(details) = &request.passenger_details {
            booking.passenger_details = details.clone();
        }
        if let Some(patch) = &request.extras {
            booking.extras = Self::merge_extras(&booking.extras, patch);
        }
        booking.payment = payment;
        booking.touch();
        Ok(())
    }

    pub fn merge_extras(current: &Extras, patch: &ExtrasPatch) -> Extras {
        Extras {
            baggage: patch.baggage.unwrap_or(current.baggage),
            meal: patch.meal.clone().or_else(|| current.meal.clone()),
        }
    }

    pub fn merge_payment(current: &PaymentSnapshot, patch: &PaymentPatch) -> PaymentSnapshot {
        PaymentSnapshot {
            amount: patch.amount.unwrap_or(current.amount),
            currency: patch.currency.clone().unwrap_or_else(|| current.currency.clone()),
            method: patch.method.clone().unwrap_or_else(|| current.method.clone()),
        }
    }
}
