use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::json;
use skyseat_booking::{
    EnginePolicy, FlightRepairer, ModifyRequest, ReservationEngine, ReserveRequest,
};
use skyseat_core::events::EventSink;
use skyseat_core::repository::{
    BookingLedger, CommitOutcome, FlightDirectory, ReservationStore, SeatMutation, StoreResult,
    UserDirectory,
};
use skyseat_core::{
    Booking, BookingStatus, Caller, Extras, Flight, FlightRecord, FlightStatus, PaymentPatch,
    PaymentSnapshot, ReservationError, UserSummary,
};
use skyseat_shared::{topics, Masked};
use skyseat_store::InMemoryStore;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Default)]
struct RecordingSink {
    published: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
    fn topics(&self) -> Vec<String> {
        self.published.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn publish(
        &self,
        topic: &str,
        _key: &str,
        payload: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.published.lock().unwrap().push((topic.to_string(), payload.to_string()));
        Ok(())
    }
}

/// Delegates reads and rejects every commit as stale.
struct AlwaysStale(Arc<InMemoryStore>);

#[async_trait]
impl FlightDirectory for AlwaysStale {
    async fn get_flight(&self, id: Uuid) -> StoreResult<Option<FlightRecord>> {
        self.0.get_flight(id).await
    }

    async fn find_by_number(&self, flight_number: &str) -> StoreResult<Option<FlightRecord>> {
        self.0.find_by_number(flight_number).await
    }
}

#[async_trait]
impl BookingLedger for AlwaysStale {
    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        self.0.get_booking(id).await
    }

    async fn list_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Booking>> {
        self.0.list_by_user(user_id).await
    }

    async fn list_by_flight(&self, flight_id: Uuid) -> StoreResult<Vec<Booking>> {
        self.0.list_by_flight(flight_id).await
    }
}

#[async_trait]
impl ReservationStore for AlwaysStale {
    async fn commit(&self, _mutation: SeatMutation) -> StoreResult<CommitOutcome> {
        Ok(CommitOutcome::Conflict)
    }
}

/// A user directory that is always down.
struct UnreachableUsers;

#[async_trait]
impl UserDirectory for UnreachableUsers {
    async fn get_user(&self, _id: Uuid) -> StoreResult<Option<UserSummary>> {
        Err("user directory unreachable".into())
    }

    async fn remove_user(&self, _id: Uuid) -> StoreResult<bool> {
        Err("user directory unreachable".into())
    }
}

struct Harness {
    store: Arc<InMemoryStore>,
    events: Arc<RecordingSink>,
    engine: Arc<ReservationEngine>,
}

fn harness() -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let events = Arc::new(RecordingSink::default());
    let engine = Arc::new(ReservationEngine::new(
        store.clone(),
        store.clone(),
        events.clone(),
        EnginePolicy::default(),
    ));
    Harness { store, events, engine }
}

fn flight(price: f64, seats: u32) -> Flight {
    let departure = Utc::now() + Duration::days(10);
    Flight::new("SK101", "JFK", "LHR", departure, departure + Duration::hours(7), price, seats)
}

fn seats_left(store: &InMemoryStore, flight_id: Uuid) -> u64 {
    store.flight_document(flight_id).unwrap().unwrap()["seatsAvailable"]
        .as_u64()
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reservations_never_oversell() {
    let h = harness();
    let flight_id = h.store.insert_flight(&flight(100.0, 5)).unwrap();

    let mut handles = Vec::new();
    for _ in 0..20 {
        let engine = h.engine.clone();
        handles.push(tokio::spawn(async move {
            let caller = Caller::user(Uuid::new_v4());
            engine.reserve(&caller, ReserveRequest::new(flight_id, 1)).await
        }));
    }

    let mut confirmed = 0;
    let mut sold_out = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => confirmed += 1,
            Err(ReservationError::InsufficientInventory { .. }) => sold_out += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(confirmed, 5);
    assert_eq!(sold_out, 15);
    assert_eq!(seats_left(&h.store, flight_id), 0);
    assert_eq!(h.store.list_by_flight(flight_id).await.unwrap().len(), 5);
}

#[tokio::test]
async fn test_reserve_prices_fare_and_resolves_owner() {
    let h = harness();
    let user_id = Uuid::new_v4();
    h.store
        .insert_user(UserSummary {
            id: user_id,
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: Masked::new("ada@example.com".into()),
            phone: None,
        })
        .unwrap();
    let flight_id = h.store.insert_flight(&flight(150.0, 10)).unwrap();

    let view = h
        .engine
        .reserve(&Caller::user(user_id), ReserveRequest::new(flight_id, 3))
        .await
        .unwrap();

    assert_eq!(view.booking.payment.amount, 450.0);
    assert_eq!(view.booking.payment.currency, "USD");
    assert_eq!(view.booking.status, BookingStatus::Confirmed);
    assert_eq!(view.booking.version, 1);
    assert_eq!(view.flight.unwrap().seats_available, 7);
    assert_eq!(view.user.unwrap().first_name, "Ada");
    assert_eq!(h.events.topics(), vec![topics::BOOKING_CONFIRMED.to_string()]);
}

#[tokio::test]
async fn test_reserve_rejects_wrong_amount() {
    let h = harness();
    let flight_id = h.store.insert_flight(&flight(150.0, 10)).unwrap();

    let mut request = ReserveRequest::new(flight_id, 3);
    request.payment = PaymentPatch { amount: Some(449.50), ..Default::default() };
    let err = h.engine.reserve(&Caller::user(Uuid::new_v4()), request).await.unwrap_err();

    match err {
        ReservationError::PaymentMismatch { expected, proposed, .. } => {
            assert_eq!(expected, 450.0);
            assert_eq!(proposed, 449.50);
        }
        other => panic!("expected PaymentMismatch, got {}", other),
    }
    assert_eq!(seats_left(&h.store, flight_id), 10);

    let mut request = ReserveRequest::new(flight_id, 3);
    request.payment = PaymentPatch { amount: Some(450.005), ..Default::default() };
    assert!(h.engine.reserve(&Caller::user(Uuid::new_v4()), request).await.is_ok());
}

#[tokio::test]
async fn test_reserve_rejects_zero_passengers_and_cancelled_flights() {
    let h = harness();
    let mut cancelled = flight(100.0, 10);
    cancelled.status = FlightStatus::Cancelled;
    let cancelled_id = h.store.insert_flight(&cancelled).unwrap();
    let open_id = h.store.insert_flight(&flight(100.0, 10)).unwrap();
    let caller = Caller::user(Uuid::new_v4());

    assert!(matches!(
        h.engine.reserve(&caller, ReserveRequest::new(open_id, 0)).await,
        Err(ReservationError::InvalidRequest(_))
    ));
    assert!(matches!(
        h.engine.reserve(&caller, ReserveRequest::new(cancelled_id, 1)).await,
        Err(ReservationError::FlightNotBookable { .. })
    ));
    assert!(matches!(
        h.engine.reserve(&caller, ReserveRequest::new(Uuid::new_v4(), 1)).await,
        Err(ReservationError::FlightNotFound(_))
    ));
}

#[tokio::test]
async fn test_malformed_flight_blocks_every_mutation() {
    let h = harness();
    let flight_id = Uuid::new_v4();
    let mut doc = flight(100.0, 10).to_document().unwrap();
    doc["price"] = json!("100");
    h.store.insert_flight_document(flight_id, doc.clone()).unwrap();

    let err = h
        .engine
        .reserve(&Caller::user(Uuid::new_v4()), ReserveRequest::new(flight_id, 1))
        .await
        .unwrap_err();

    match err {
        ReservationError::InvalidInventoryRecord { violations, .. } => {
            assert!(violations.iter().any(|v| v.field == "price"));
        }
        other => panic!("expected InvalidInventoryRecord, got {}", other),
    }
    assert_eq!(h.store.flight_document(flight_id).unwrap().unwrap(), doc);
    assert!(h.store.list_by_flight(flight_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_modify_applies_seat_delta() {
    let h = harness();
    let flight_id = h.store.insert_flight(&flight(100.0, 10)).unwrap();
    let owner = Caller::user(Uuid::new_v4());

    h.engine
        .reserve(&Caller::user(Uuid::new_v4()), ReserveRequest::new(flight_id, 3))
        .await
        .unwrap();
    let booking = h.engine.reserve(&owner, ReserveRequest::new(flight_id, 2)).await.unwrap().booking;
    assert_eq!(seats_left(&h.store, flight_id), 5);

    let grown = h
        .engine
        .modify(booking.id, &owner, ModifyRequest { passengers: Some(4), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(grown.booking.passengers, 4);
    assert_eq!(grown.booking.payment.amount, 400.0);
    assert_eq!(grown.booking.version, 2);
    assert_eq!(seats_left(&h.store, flight_id), 3);

    let err = h
        .engine
        .modify(booking.id, &owner, ModifyRequest { passengers: Some(8), ..Default::default() })
        .await
        .unwrap_err();
    assert!(matches!(err, ReservationError::InsufficientInventory { requested: 4, available: 3 }));
    assert_eq!(seats_left(&h.store, flight_id), 3);
    assert_eq!(h.store.get_booking(booking.id).await.unwrap().unwrap().passengers, 4);

    h.engine
        .modify(booking.id, &owner, ModifyRequest { passengers: Some(1), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(seats_left(&h.store, flight_id), 6);
}

#[tokio::test]
async fn test_cancel_is_idempotent() {
    let h = harness();
    let flight_id = h.store.insert_flight(&flight(100.0, 5)).unwrap();
    let owner = Caller::user(Uuid::new_v4());
    let booking = h.engine.reserve(&owner, ReserveRequest::new(flight_id, 2)).await.unwrap().booking;

    let first = h.engine.cancel(booking.id, &owner).await.unwrap();
    assert!(!first.already_canceled);
    assert_eq!(first.booking.booking.status, BookingStatus::Canceled);
    assert_eq!(seats_left(&h.store, flight_id), 5);

    let second = h.engine.cancel(booking.id, &owner).await.unwrap();
    assert!(second.already_canceled);
    assert_eq!(seats_left(&h.store, flight_id), 5);

    assert!(matches!(
        h.engine
            .modify(booking.id, &owner, ModifyRequest { passengers: Some(1), ..Default::default() })
            .await,
        Err(ReservationError::InvalidState(_))
    ));

    // A flight that no longer decodes must not break the no-op.
    let mut doc = h.store.flight_document(flight_id).unwrap().unwrap();
    doc["price"] = json!("100");
    h.store.insert_flight_document(flight_id, doc).unwrap();
    let third = h.engine.cancel(booking.id, &owner).await.unwrap();
    assert!(third.already_canceled);
    assert!(third.booking.flight.is_none());
    assert_eq!(third.booking.booking.status, BookingStatus::Canceled);

    let canceled_events = h
        .events
        .topics()
        .into_iter()
        .filter(|t| t == topics::BOOKING_CANCELED)
        .count();
    assert_eq!(canceled_events, 1);
}

#[tokio::test]
async fn test_strangers_are_forbidden() {
    let h = harness();
    let flight_id = h.store.insert_flight(&flight(100.0, 5)).unwrap();
    let owner = Caller::user(Uuid::new_v4());
    let stranger = Caller::user(Uuid::new_v4());
    let booking = h.engine.reserve(&owner, ReserveRequest::new(flight_id, 1)).await.unwrap().booking;

    assert!(matches!(h.engine.view(booking.id, &stranger).await, Err(ReservationError::Forbidden(_))));
    assert!(matches!(h.engine.cancel(booking.id, &stranger).await, Err(ReservationError::Forbidden(_))));
    assert!(matches!(
        h.engine
            .modify(booking.id, &stranger, ModifyRequest { passengers: Some(3), ..Default::default() })
            .await,
        Err(ReservationError::Forbidden(_))
    ));
    assert!(matches!(
        h.engine.bookings_for_user(owner.user_id, &stranger).await,
        Err(ReservationError::Forbidden(_))
    ));
    assert_eq!(seats_left(&h.store, flight_id), 4);
    let stored = h.store.get_booking(booking.id).await.unwrap().unwrap();
    assert_eq!(stored.version, 1);
    assert_eq!(stored.passengers, 1);
    assert_eq!(stored.status, BookingStatus::Confirmed);

    let admin = Caller::admin(Uuid::new_v4());
    assert!(h.engine.view(booking.id, &admin).await.is_ok());
}

#[tokio::test]
async fn test_owner_lookup_failure_does_not_fail_committed_reservation() {
    let store = Arc::new(InMemoryStore::new());
    let flight_id = store.insert_flight(&flight(100.0, 5)).unwrap();
    let engine = ReservationEngine::new(
        store.clone(),
        Arc::new(UnreachableUsers),
        Arc::new(RecordingSink::default()),
        EnginePolicy::default(),
    );
    let owner = Caller::user(Uuid::new_v4());

    let view = engine.reserve(&owner, ReserveRequest::new(flight_id, 2)).await.unwrap();
    assert!(view.user.is_none());
    assert_eq!(view.booking.status, BookingStatus::Confirmed);
    assert_eq!(seats_left(&store, flight_id), 3);
    assert_eq!(store.list_by_flight(flight_id).await.unwrap().len(), 1);

    let listed = engine.bookings_for_user(owner.user_id, &owner).await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn test_persistent_conflicts_surface_as_contention() {
    let store = Arc::new(InMemoryStore::new());
    let flight_id = store.insert_flight(&flight(100.0, 5)).unwrap();
    let policy = EnginePolicy {
        max_attempts: 3,
        retry_backoff: std::time::Duration::from_millis(1),
        ..EnginePolicy::default()
    };
    let engine = ReservationEngine::new(
        Arc::new(AlwaysStale(store.clone())),
        store.clone(),
        Arc::new(RecordingSink::default()),
        policy,
    );

    let err = engine
        .reserve(&Caller::user(Uuid::new_v4()), ReserveRequest::new(flight_id, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, ReservationError::Contention { attempts: 3, .. }));
    assert!(err.is_retryable());
    assert_eq!(seats_left(&store, flight_id), 5);
}

#[tokio::test]
async fn test_over_credit_raises_alert_and_writes_nothing() {
    let h = harness();
    let flight_id = h.store.insert_flight(&flight(100.0, 5)).unwrap();
    let owner = Caller::user(Uuid::new_v4());

    // A ledger entry the seat count never accounted for.
    let mut orphan = Booking::confirmed(
        owner.user_id,
        flight_id,
        2,
        Vec::new(),
        Extras::default(),
        PaymentSnapshot { amount: 200.0, currency: "USD".into(), method: "card".into() },
    );
    orphan.version = 1;
    h.store.insert_booking(orphan.clone()).unwrap();

    let err = h.engine.cancel(orphan.id, &owner).await.unwrap_err();
    assert!(matches!(err, ReservationError::InventoryCorruption { .. }));
    assert_eq!(seats_left(&h.store, flight_id), 5);
    assert_eq!(
        h.store.get_booking(orphan.id).await.unwrap().unwrap().status,
        BookingStatus::Confirmed
    );
    assert_eq!(h.events.topics(), vec![topics::INVENTORY_ALERTS.to_string()]);
}

#[tokio::test]
async fn test_account_cascade_cancels_every_booking() {
    let h = harness();
    let first = h.store.insert_flight(&flight(100.0, 5)).unwrap();
    let second = h.store.insert_flight(&flight(80.0, 5)).unwrap();
    let owner = Caller::user(Uuid::new_v4());

    h.engine.reserve(&owner, ReserveRequest::new(first, 2)).await.unwrap();
    let canceled = h.engine.reserve(&owner, ReserveRequest::new(second, 1)).await.unwrap().booking;
    h.engine.cancel(canceled.id, &owner).await.unwrap();
    h.engine.reserve(&owner, ReserveRequest::new(second, 3)).await.unwrap();

    let report = h.engine.cancel_all_for_user(owner.user_id, &owner).await.unwrap();
    assert_eq!(report.canceled, 2);
    assert_eq!(seats_left(&h.store, first), 5);
    assert_eq!(seats_left(&h.store, second), 5);

    let views = h.engine.bookings_for_user(owner.user_id, &owner).await.unwrap();
    assert_eq!(views.len(), 3);
    assert!(views.iter().all(|v| v.booking.status == BookingStatus::Canceled));
}

#[tokio::test]
async fn test_reconcile_reports_drift() {
    let h = harness();
    let flight_id = h.store.insert_flight(&flight(100.0, 6)).unwrap();
    let owner = Caller::user(Uuid::new_v4());
    let admin = Caller::admin(Uuid::new_v4());
    h.engine.reserve(&owner, ReserveRequest::new(flight_id, 2)).await.unwrap();

    assert!(matches!(
        h.engine.reconcile(flight_id, &owner).await,
        Err(ReservationError::Forbidden(_))
    ));

    let report = h.engine.reconcile(flight_id, &admin).await.unwrap();
    assert!(report.consistent);
    assert_eq!(report.committed, 2);
    assert_eq!(report.seats_available, 4);

    let mut doc = h.store.flight_document(flight_id).unwrap().unwrap();
    doc["seatsAvailable"] = json!(1);
    h.store.insert_flight_document(flight_id, doc).unwrap();

    let report = h.engine.reconcile(flight_id, &admin).await.unwrap();
    assert!(!report.consistent);
    assert!(h.events.topics().contains(&topics::INVENTORY_ALERTS.to_string()));
}

#[tokio::test]
async fn test_repairer_restores_bookable_record() {
    let h = harness();
    let flight_id = Uuid::new_v4();
    let mut doc = flight(100.0, 8).to_document().unwrap();
    doc["price"] = json!({ "economy": 120.0, "business": 600.0 });
    doc.as_object_mut().unwrap().remove("seatsAvailable");
    h.store.insert_flight_document(flight_id, doc).unwrap();

    let repairer = FlightRepairer::new(h.store.clone(), 3);

    let preview = repairer.repair(flight_id, true).await.unwrap();
    assert!(!preview.applied);
    assert!(preview.remaining.is_empty());
    assert!(h.store.flight_document(flight_id).unwrap().unwrap()["price"].is_object());

    let outcome = repairer.repair(flight_id, false).await.unwrap();
    assert!(outcome.applied);
    assert_eq!(seats_left(&h.store, flight_id), 8);

    let view = h
        .engine
        .reserve(&Caller::user(Uuid::new_v4()), ReserveRequest::new(flight_id, 2))
        .await
        .unwrap();
    assert_eq!(view.booking.payment.amount, 240.0);
}
