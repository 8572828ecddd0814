use async_trait::async_trait;
use serde_json::{Map, Value};
use skyseat_core::flight::normalize_code;
use skyseat_core::repository::{
    BookingLedger, BookingWrite, CommitOutcome, FlightDirectory, FlightMaintenance,
    ReservationStore, SeatMutation, StoreResult, UserDirectory,
};
use skyseat_core::{Booking, Flight, FlightRecord, UserSummary};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Default)]
struct State {
    flights: HashMap<Uuid, FlightRecord>,
    bookings: HashMap<Uuid, Booking>,
    users: HashMap<Uuid, UserSummary>,
}

/// Process-local store with the same versioned commit contract as the Postgres one.
/// Backs tests and single-node runs.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, State>> {
        self.state.lock().map_err(|_| "in-memory store poisoned".into())
    }

    pub fn insert_flight(&self, flight: &Flight) -> StoreResult<Uuid> {
        let id = Uuid::new_v4();
        self.insert_flight_document(id, flight.to_document()?)?;
        Ok(id)
    }

    /// Seeds a raw document, bypassing every check. Lets callers plant malformed records.
    pub fn insert_flight_document(&self, id: Uuid, document: Value) -> StoreResult<()> {
        self.lock()?.flights.insert(id, FlightRecord::new(id, document));
        Ok(())
    }

    pub fn flight_document(&self, id: Uuid) -> StoreResult<Option<Value>> {
        Ok(self.lock()?.flights.get(&id).map(|r| r.document.clone()))
    }

    pub fn insert_user(&self, user: UserSummary) -> StoreResult<()> {
        self.lock()?.users.insert(user.id, user);
        Ok(())
    }

    pub fn insert_booking(&self, booking: Booking) -> StoreResult<()> {
        self.lock()?.bookings.insert(booking.id, booking);
        Ok(())
    }
}

#[async_trait]
impl FlightDirectory for InMemoryStore {
    async fn get_flight(&self, id: Uuid) -> StoreResult<Option<FlightRecord>> {
        Ok(self.lock()?.flights.get(&id).cloned())
    }

    async fn find_by_number(&self, flight_number: &str) -> StoreResult<Option<FlightRecord>> {
        let wanted = normalize_code(flight_number);
        Ok(self
            .lock()?
            .flights
            .values()
            .find(|r| {
                r.document
                    .get("flightNumber")
                    .and_then(Value::as_str)
                    .is_some_and(|code| normalize_code(code) == wanted)
            })
            .cloned())
    }
}

#[async_trait]
impl BookingLedger for InMemoryStore {
    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self.lock()?.bookings.get(&id).cloned())
    }

    async fn list_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Booking>> {
        let mut bookings: Vec<Booking> = self
            .lock()?
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn list_by_flight(&self, flight_id: Uuid) -> StoreResult<Vec<Booking>> {
        Ok(self
            .lock()?
            .bookings
            .values()
            .filter(|b| b.flight_id == flight_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ReservationStore for InMemoryStore {
    async fn commit(&self, mutation: SeatMutation) -> StoreResult<CommitOutcome> {
        let mut state = self.lock()?;

        // Every check happens before the first write.
        match state.flights.get(&mutation.flight_id) {
            Some(record) if record.version == mutation.expected_flight_version => {}
            Some(_) => return Ok(CommitOutcome::Conflict),
            None => return Err(format!("flight {} not found", mutation.flight_id).into()),
        }
        match &mutation.booking {
            BookingWrite::Insert(booking) if state.bookings.contains_key(&booking.id) => {
                return Ok(CommitOutcome::Conflict);
            }
            BookingWrite::Update { booking, expected_version } => {
                match state.bookings.get(&booking.id) {
                    Some(stored) if stored.version == *expected_version => {}
                    _ => return Ok(CommitOutcome::Conflict),
                }
            }
            BookingWrite::Insert(_) => {}
        }

        if let Some(record) = state.flights.get_mut(&mutation.flight_id) {
            if let Some(doc) = record.document.as_object_mut() {
                doc.insert("seatsAvailable".to_string(), Value::from(mutation.seats_available));
            }
            record.version += 1;
        }
        let booking = match mutation.booking {
            BookingWrite::Insert(booking) => booking,
            BookingWrite::Update { booking, .. } => booking,
        };
        state.bookings.insert(booking.id, booking);

        Ok(CommitOutcome::Applied)
    }
}

#[async_trait]
impl FlightMaintenance for InMemoryStore {
    async fn patch_flight(
        &self,
        id: Uuid,
        expected_version: i64,
        patch: &Map<String, Value>,
    ) -> StoreResult<CommitOutcome> {
        let mut state = self.lock()?;
        let record = state
            .flights
            .get_mut(&id)
            .ok_or_else(|| format!("flight {} not found", id))?;
        if record.version != expected_version {
            return Ok(CommitOutcome::Conflict);
        }

        if !record.document.is_object() {
            record.document = Value::Object(Map::new());
        }
        if let Some(doc) = record.document.as_object_mut() {
            for (key, value) in patch {
                doc.insert(key.clone(), value.clone());
            }
        }
        record.version += 1;
        Ok(CommitOutcome::Applied)
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn get_user(&self, id: Uuid) -> StoreResult<Option<UserSummary>> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn remove_user(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.lock()?.users.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use skyseat_core::{Extras, PaymentSnapshot};

    fn flight() -> Flight {
        let departure = Utc::now() + Duration::days(1);
        Flight::new("SK7", "CPH", "ARN", departure, departure + Duration::hours(1), 90.0, 4)
    }

    fn booking(flight_id: Uuid) -> Booking {
        let mut booking = Booking::confirmed(
            Uuid::new_v4(),
            flight_id,
            2,
            Vec::new(),
            Extras::default(),
            PaymentSnapshot { amount: 180.0, currency: "USD".into(), method: "card".into() },
        );
        booking.version = 1;
        booking
    }

    #[tokio::test]
    async fn test_commit_bumps_flight_version_and_seat_count() {
        let store = InMemoryStore::new();
        let flight_id = store.insert_flight(&flight()).unwrap();
        let booking = booking(flight_id);

        let outcome = store
            .commit(SeatMutation {
                flight_id,
                expected_flight_version: 0,
                seats_available: 2,
                booking: BookingWrite::Insert(booking.clone()),
            })
            .await
            .unwrap();
        assert_eq!(outcome, CommitOutcome::Applied);

        let record = store.get_flight(flight_id).await.unwrap().unwrap();
        assert_eq!(record.version, 1);
        assert_eq!(record.document["seatsAvailable"], 2);
        assert!(store.get_booking(booking.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_stale_versions_write_nothing() {
        let store = InMemoryStore::new();
        let flight_id = store.insert_flight(&flight()).unwrap();
        let booking = booking(flight_id);
        store.insert_booking(booking.clone()).unwrap();

        let stale_flight = store
            .commit(SeatMutation {
                flight_id,
                expected_flight_version: 3,
                seats_available: 0,
                booking: BookingWrite::Insert(self::booking(flight_id)),
            })
            .await
            .unwrap();
        assert_eq!(stale_flight, CommitOutcome::Conflict);

        let mut updated = booking.clone();
        updated.version = 6;
        let stale_booking = store
            .commit(SeatMutation {
                flight_id,
                expected_flight_version: 0,
                seats_available: 0,
                booking: BookingWrite::Update { booking: updated, expected_version: 5 },
            })
            .await
            .unwrap();
        assert_eq!(stale_booking, CommitOutcome::Conflict);

        let record = store.get_flight(flight_id).await.unwrap().unwrap();
        assert_eq!(record.version, 0);
        assert_eq!(record.document["seatsAvailable"], 4);
        assert_eq!(store.get_booking(booking.id).await.unwrap().unwrap().version, 1);
    }

    #[tokio::test]
    async fn test_find_by_number_ignores_case() {
        let store = InMemoryStore::new();
        let flight_id = store.insert_flight(&flight()).unwrap();

        let found = store.find_by_number(" sk7").await.unwrap().unwrap();
        assert_eq!(found.id, flight_id);
        assert!(store.find_by_number("SK8").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_patch_merges_keys() {
        let store = InMemoryStore::new();
        let flight_id = store.insert_flight(&flight()).unwrap();

        let mut patch = Map::new();
        patch.insert("price".into(), Value::from(120.0));
        assert_eq!(store.patch_flight(flight_id, 0, &patch).await.unwrap(), CommitOutcome::Applied);
        assert_eq!(store.patch_flight(flight_id, 0, &patch).await.unwrap(), CommitOutcome::Conflict);

        let doc = store.flight_document(flight_id).unwrap().unwrap();
        assert_eq!(doc["price"], 120.0);
        assert_eq!(doc["flightNumber"], "SK7");
    }
}
