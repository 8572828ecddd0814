pub mod booking;
pub mod error;
pub mod events;
pub mod flight;
pub mod guard;
pub mod identity;
pub mod payment;
pub mod repair;
pub mod repository;

pub use booking::{
    Booking, BookingStatus, BookingView, Extras, ExtrasPatch, PassengerDetail, PaymentPatch,
    PaymentSnapshot,
};
pub use error::{ReservationError, ReservationResult};
pub use flight::{Amenities, Flight, FlightRecord, FlightStatus, FlightSummary};
pub use guard::SchemaViolation;
pub use identity::{Caller, Role, UserSummary};
