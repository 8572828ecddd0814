use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::booking::Booking;
use crate::flight::FlightRecord;
use crate::identity::UserSummary;

pub type StoreResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Read access to flight documents
#[async_trait]
pub trait FlightDirectory: Send + Sync {
    async fn get_flight(&self, id: Uuid) -> StoreResult<Option<FlightRecord>>;

    /// Case-insensitive lookup by flight code.
    async fn find_by_number(&self, flight_number: &str) -> StoreResult<Option<FlightRecord>>;
}

/// Read access to booking records
#[async_trait]
pub trait BookingLedger: Send + Sync {
    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>>;

    async fn list_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Booking>>;

    async fn list_by_flight(&self, flight_id: Uuid) -> StoreResult<Vec<Booking>>;
}

/// The booking half of a seat mutation.
#[derive(Debug, Clone)]
pub enum BookingWrite {
    Insert(Booking),
    /// Applies only if the stored booking is still at `expected_version`.
    Update { booking: Booking, expected_version: i64 },
}

impl BookingWrite {
    pub fn booking(&self) -> &Booking {
        match self {
            BookingWrite::Insert(booking) => booking,
            BookingWrite::Update { booking, .. } => booking,
        }
    }
}

/// One atomic unit: a flight's new seat count plus the ledger write that explains it.
#[derive(Debug, Clone)]
pub struct SeatMutation {
    pub flight_id: Uuid,
    pub expected_flight_version: i64,
    pub seats_available: u32,
    pub booking: BookingWrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Applied,
    /// A version check failed; nothing was written.
    Conflict,
}

/// Store capable of applying a seat mutation all-or-nothing.
#[async_trait]
pub trait ReservationStore: FlightDirectory + BookingLedger {
    /// Writes the seat count and the booking in one transaction, bumping both versions.
    async fn commit(&self, mutation: SeatMutation) -> StoreResult<CommitOutcome>;
}

/// Operator access for repairing malformed flight documents.
#[async_trait]
pub trait FlightMaintenance: Send + Sync {
    /// Shallow-merges `patch` into the document if it is still at `expected_version`.
    async fn patch_flight(
        &self,
        id: Uuid,
        expected_version: i64,
        patch: &Map<String, Value>,
    ) -> StoreResult<CommitOutcome>;
}

/// Owner lookups for display and the account-deletion cascade.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user(&self, id: Uuid) -> StoreResult<Option<UserSummary>>;

    /// Returns false when no such user existed.
    async fn remove_user(&self, id: Uuid) -> StoreResult<bool>;
}
