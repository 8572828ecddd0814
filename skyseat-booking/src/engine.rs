use chrono::Utc;
use serde::{Deserialize, Serialize};
use skyseat_core::events::EventSink;
use skyseat_core::payment::PricingPolicy;
use skyseat_core::repository::{BookingWrite, CommitOutcome, ReservationStore, SeatMutation, UserDirectory};
use skyseat_core::{
    Booking, BookingStatus, BookingView, Caller, Extras, Flight, FlightRecord, FlightSummary,
    PassengerDetail, PaymentPatch, PaymentSnapshot, ReservationError, ReservationResult,
};
use skyseat_shared::{
    topics, BookingCanceledEvent, BookingConfirmedEvent, BookingModifiedEvent, InventoryAlertEvent,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::audit::InventoryReport;
use crate::changes::{ChangeHandler, ModifyRequest};
use crate::lifecycle::{apply_seat_delta, BookingLifecycle, Transition};
use crate::locks::FlightLocks;

// ============================================================================
// Requests / Results
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ReserveRequest {
    pub flight_id: Uuid,
    pub passengers: u32,
    #[serde(default)]
    pub passenger_details: Vec<PassengerDetail>,
    #[serde(default)]
    pub extras: Option<Extras>,
    #[serde(default)]
    pub payment: PaymentPatch,
}

impl ReserveRequest {
    pub fn new(flight_id: Uuid, passengers: u32) -> Self {
        Self {
            flight_id,
            passengers,
            passenger_details: Vec::new(),
            extras: None,
            payment: PaymentPatch::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelOutcome {
    pub booking: BookingView,
    pub already_canceled: bool,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CascadeReport {
    pub canceled: usize,
    pub already_canceled: usize,
}

/// Bounds on how long a mutation may wait for a flight and how often it retries.
#[derive(Debug, Clone)]
pub struct EnginePolicy {
    pub max_attempts: u32,
    pub lock_wait: Duration,
    pub retry_backoff: Duration,
    pub pricing: PricingPolicy,
}

impl Default for EnginePolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lock_wait: Duration::from_secs(2),
            retry_backoff: Duration::from_millis(20),
            pricing: PricingPolicy::default(),
        }
    }
}

/// What a mutation wants written for the flight state it was shown.
enum Plan {
    Write { seats_available: u32, booking: BookingWrite },
    Unchanged(Booking),
}

struct Committed {
    flight: Flight,
    booking: Booking,
    changed: bool,
}

// ============================================================================
// Engine
// ============================================================================

/// Applies booking intents to flight inventory and the booking ledger as one unit.
///
/// Mutations of a flight run inside its per-process critical section and are
/// committed with a version check on the flight (and booking) record, so a
/// writer in another process forces a re-read instead of a lost update.
pub struct ReservationEngine {
    store: Arc<dyn ReservationStore>,
    users: Arc<dyn UserDirectory>,
    events: Arc<dyn EventSink>,
    locks: FlightLocks,
    policy: EnginePolicy,
}

impl ReservationEngine {
    pub fn new(
        store: Arc<dyn ReservationStore>,
        users: Arc<dyn UserDirectory>,
        events: Arc<dyn EventSink>,
        policy: EnginePolicy,
    ) -> Self {
        Self {
            store,
            users,
            events,
            locks: FlightLocks::new(),
            policy,
        }
    }

    pub fn policy(&self) -> &EnginePolicy {
        &self.policy
    }

    /// Reserve seats on a flight for the caller
    pub async fn reserve(&self, caller: &Caller, request: ReserveRequest) -> ReservationResult<BookingView> {
        let transition = BookingLifecycle::confirm(request.passengers)?;
        let flight_id = request.flight_id;
        let pricing = &self.policy.pricing;

        let committed = self
            .atomically(flight_id, None, |flight, _| {
                if !flight.status.accepts_bookings() {
                    return Err(ReservationError::FlightNotBookable { flight_id, status: flight.status });
                }
                let seats_available = apply_seat_delta(flight_id, flight, transition.seat_delta())?;

                let expected = pricing.expected(flight.price, request.passengers);
                let amount = match request.payment.amount {
                    Some(proposed) if !pricing.validate(expected, proposed) => {
                        return Err(ReservationError::PaymentMismatch {
                            price: flight.price,
                            passengers: request.passengers,
                            expected,
                            proposed,
                        });
                    }
                    Some(proposed) => proposed,
                    None => expected,
                };

                let mut booking = Booking::confirmed(
                    caller.user_id,
                    flight_id,
                    request.passengers,
                    request.passenger_details.clone(),
                    request.extras.clone().unwrap_or_default(),
                    PaymentSnapshot {
                        amount,
                        currency: pricing.currency_or_default(request.payment.currency.clone()),
                        method: pricing.method_or_default(request.payment.method.clone()),
                    },
                );
                booking.version = 1;

                Ok(Plan::Write { seats_available, booking: BookingWrite::Insert(booking) })
            })
            .await?;

        let booking = committed.booking;
        info!(
            "Booking confirmed: {} on flight {} ({} passengers, {} seats left)",
            booking.id, flight_id, booking.passengers, committed.flight.seats_available
        );
        self.emit(
            topics::BOOKING_CONFIRMED,
            &booking.id.to_string(),
            &BookingConfirmedEvent {
                booking_id: booking.id,
                flight_id,
                user_id: booking.user_id,
                passengers: booking.passengers,
                amount: booking.payment.amount,
                currency: booking.payment.currency.clone(),
                seats_available: committed.flight.seats_available,
                timestamp: Utc::now().timestamp(),
            },
        )
        .await;

        Ok(self.present(booking, Some(FlightSummary::new(flight_id, &committed.flight))).await)
    }

    /// Change passengers, details, extras or payment of a Confirmed booking
    pub async fn modify(
        &self,
        booking_id: Uuid,
        caller: &Caller,
        request: ModifyRequest,
    ) -> ReservationResult<BookingView> {
        let booking = self.authorized_booking(booking_id, caller).await?;
        BookingLifecycle::ensure_mutable(&booking)?;
        let flight_id = booking.flight_id;
        let previous_passengers = booking.passengers;
        let pricing = &self.policy.pricing;

        let committed = self
            .atomically(flight_id, Some(booking_id), |flight, current| {
                let current = current.ok_or(ReservationError::BookingNotFound(booking_id))?;
                let transition = ChangeHandler::transition(current, &request)?;
                if transition.consumes_seats() && !flight.status.accepts_bookings() {
                    return Err(ReservationError::FlightNotBookable { flight_id, status: flight.status });
                }
                let seats_available = apply_seat_delta(flight_id, flight, transition.seat_delta())?;

                let mut updated = current.clone();
                ChangeHandler::apply(&mut updated, &request, flight, pricing)?;
                updated.version = current.version + 1;

                Ok(Plan::Write {
                    seats_available,
                    booking: BookingWrite::Update { booking: updated, expected_version: current.version },
                })
            })
            .await?;

        let booking = committed.booking;
        info!(
            "Booking modified: {} on flight {} ({} -> {} passengers, {} seats left)",
            booking.id, flight_id, previous_passengers, booking.passengers, committed.flight.seats_available
        );
        self.emit(
            topics::BOOKING_MODIFIED,
            &booking.id.to_string(),
            &BookingModifiedEvent {
                booking_id: booking.id,
                flight_id,
                previous_passengers,
                passengers: booking.passengers,
                seats_available: committed.flight.seats_available,
                timestamp: Utc::now().timestamp(),
            },
        )
        .await;

        Ok(self.present(booking, Some(FlightSummary::new(flight_id, &committed.flight))).await)
    }

    /// Cancel a booking and release its seats. Re-canceling is a no-op.
    pub async fn cancel(&self, booking_id: Uuid, caller: &Caller) -> ReservationResult<CancelOutcome> {
        let booking = self.authorized_booking(booking_id, caller).await?;
        if booking.is_canceled() {
            // Nothing is written here, so a flight that fails the guard does not block the no-op.
            let record = self.load_flight(booking.flight_id).await?;
            let flight = match record.decode() {
                Ok(flight) => Some(FlightSummary::new(record.id, &flight)),
                Err(e) => {
                    warn!("Presenting canceled booking {} without its flight: {}", booking.id, e);
                    None
                }
            };
            return Ok(CancelOutcome {
                booking: self.present(booking, flight).await,
                already_canceled: true,
            });
        }
        let flight_id = booking.flight_id;

        let committed = self
            .atomically(flight_id, Some(booking_id), |flight, current| {
                let current = current.ok_or(ReservationError::BookingNotFound(booking_id))?;
                match BookingLifecycle::cancel(current) {
                    Transition::Unchanged => Ok(Plan::Unchanged(current.clone())),
                    transition => {
                        let seats_available = apply_seat_delta(flight_id, flight, transition.seat_delta())?;
                        let mut updated = current.clone();
                        updated.status = BookingStatus::Canceled;
                        updated.version = current.version + 1;
                        updated.touch();
                        Ok(Plan::Write {
                            seats_available,
                            booking: BookingWrite::Update { booking: updated, expected_version: current.version },
                        })
                    }
                }
            })
            .await?;

        let booking = committed.booking;
        if committed.changed {
            info!(
                "Booking canceled: {} on flight {} ({} seats released, {} available)",
                booking.id, flight_id, booking.passengers, committed.flight.seats_available
            );
            self.emit(
                topics::BOOKING_CANCELED,
                &booking.id.to_string(),
                &BookingCanceledEvent {
                    booking_id: booking.id,
                    flight_id,
                    user_id: booking.user_id,
                    released_seats: booking.passengers,
                    seats_available: committed.flight.seats_available,
                    timestamp: Utc::now().timestamp(),
                },
            )
            .await;
        }

        Ok(CancelOutcome {
            booking: self.present(booking, Some(FlightSummary::new(flight_id, &committed.flight))).await,
            already_canceled: !committed.changed,
        })
    }

    pub async fn view(&self, booking_id: Uuid, caller: &Caller) -> ReservationResult<BookingView> {
        let booking = self.authorized_booking(booking_id, caller).await?;
        let flight = self.load_flight(booking.flight_id).await?.decode()?;
        let summary = FlightSummary::new(booking.flight_id, &flight);
        Ok(self.present(booking, Some(summary)).await)
    }

    /// Every booking a user owns, newest first.
    pub async fn bookings_for_user(&self, user_id: Uuid, caller: &Caller) -> ReservationResult<Vec<BookingView>> {
        if !caller.may_act_for(user_id) {
            return Err(ReservationError::Forbidden(
                "You cannot view another user's bookings".to_string(),
            ));
        }

        let mut bookings = self.store.list_by_user(user_id).await.map_err(ReservationError::store)?;
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut flights: HashMap<Uuid, Flight> = HashMap::new();
        let mut views = Vec::with_capacity(bookings.len());
        for booking in bookings {
            let flight = match flights.get(&booking.flight_id) {
                Some(flight) => flight.clone(),
                None => {
                    let flight = self.load_flight(booking.flight_id).await?.decode()?;
                    flights.insert(booking.flight_id, flight.clone());
                    flight
                }
            };
            let summary = FlightSummary::new(booking.flight_id, &flight);
            views.push(self.present(booking, Some(summary)).await);
        }
        Ok(views)
    }

    /// Account-deletion cascade: cancels each of the user's Confirmed bookings
    /// through the normal cancel path.
    pub async fn cancel_all_for_user(&self, user_id: Uuid, caller: &Caller) -> ReservationResult<CascadeReport> {
        if !caller.may_act_for(user_id) {
            return Err(ReservationError::Forbidden(
                "You cannot cancel another user's bookings".to_string(),
            ));
        }

        let bookings = self.store.list_by_user(user_id).await.map_err(ReservationError::store)?;
        let mut report = CascadeReport::default();
        let mut first_error = None;

        for booking in bookings.into_iter().filter(|b| !b.is_canceled()) {
            match self.cancel(booking.id, caller).await {
                Ok(outcome) if outcome.already_canceled => report.already_canceled += 1,
                Ok(_) => report.canceled += 1,
                Err(e) => {
                    error!("Cascade cancel of booking {} for user {} failed: {}", booking.id, user_id, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!(
                    "Canceled {} bookings for user {} ({} already canceled)",
                    report.canceled, user_id, report.already_canceled
                );
                Ok(report)
            }
        }
    }

    /// Compares a flight's seat count with its ledger. Drift raises the inventory alert.
    pub async fn reconcile(&self, flight_id: Uuid, caller: &Caller) -> ReservationResult<InventoryReport> {
        if !caller.is_admin() {
            return Err(ReservationError::Forbidden("Inventory audit requires admin role".to_string()));
        }

        let _guard = self.enter(flight_id).await?;
        let flight = self.load_flight(flight_id).await?.decode()?;
        let bookings = self.store.list_by_flight(flight_id).await.map_err(ReservationError::store)?;

        let report = InventoryReport::compute(flight_id, &flight, &bookings);
        if !report.consistent {
            self.raise_alert(flight_id, &report.describe_drift()).await;
        }
        Ok(report)
    }

    // ------------------------------------------------------------------------
    // Atomic section
    // ------------------------------------------------------------------------

    /// Runs read → plan → versioned commit for one flight, retrying on version
    /// conflicts until the attempt budget runs out.
    async fn atomically<F>(&self, flight_id: Uuid, booking_id: Option<Uuid>, mut plan: F) -> ReservationResult<Committed>
    where
        F: FnMut(&Flight, Option<&Booking>) -> ReservationResult<Plan> + Send,
    {
        let _guard = self.enter(flight_id).await?;
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let record = self.load_flight(flight_id).await?;
            let flight = self.guarded(&record)?;

            let current = match booking_id {
                Some(id) => Some(
                    self.store
                        .get_booking(id)
                        .await
                        .map_err(ReservationError::store)?
                        .ok_or(ReservationError::BookingNotFound(id))?,
                ),
                None => None,
            };

            let step = match plan(&flight, current.as_ref()) {
                Ok(step) => step,
                Err(ReservationError::InventoryCorruption { flight_id, detail }) => {
                    self.raise_alert(flight_id, &detail).await;
                    return Err(ReservationError::InventoryCorruption { flight_id, detail });
                }
                Err(e) => return Err(e),
            };

            let (seats_available, write) = match step {
                Plan::Unchanged(booking) => return Ok(Committed { flight, booking, changed: false }),
                Plan::Write { seats_available, booking } => (seats_available, booking),
            };

            if seats_available > flight.total_seats {
                let detail = format!(
                    "planned seatsAvailable {} exceeds totalSeats {}",
                    seats_available, flight.total_seats
                );
                self.raise_alert(flight_id, &detail).await;
                return Err(ReservationError::InventoryCorruption { flight_id, detail });
            }

            let mutation = SeatMutation {
                flight_id,
                expected_flight_version: record.version,
                seats_available,
                booking: write.clone(),
            };

            match self.store.commit(mutation).await.map_err(ReservationError::store)? {
                CommitOutcome::Applied => {
                    let mut flight = flight;
                    flight.seats_available = seats_available;
                    let booking = match write {
                        BookingWrite::Insert(booking) => booking,
                        BookingWrite::Update { booking, .. } => booking,
                    };
                    return Ok(Committed { flight, booking, changed: true });
                }
                CommitOutcome::Conflict => {
                    warn!(
                        "Version conflict on flight {} (attempt {}/{}), retrying",
                        flight_id, attempt, max_attempts
                    );
                    if attempt < max_attempts {
                        tokio::time::sleep(self.policy.retry_backoff * attempt).await;
                    }
                }
            }
        }

        warn!("Giving up on flight {} after {} attempts", flight_id, max_attempts);
        Err(ReservationError::Contention { flight_id, attempts: max_attempts })
    }

    async fn enter(&self, flight_id: Uuid) -> ReservationResult<tokio::sync::OwnedMutexGuard<()>> {
        match self.locks.acquire(flight_id, self.policy.lock_wait).await {
            Some(guard) => Ok(guard),
            None => {
                warn!("Timed out waiting {:?} for flight {}", self.policy.lock_wait, flight_id);
                Err(ReservationError::Contention { flight_id, attempts: 0 })
            }
        }
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    async fn load_flight(&self, flight_id: Uuid) -> ReservationResult<FlightRecord> {
        self.store
            .get_flight(flight_id)
            .await
            .map_err(ReservationError::store)?
            .ok_or(ReservationError::FlightNotFound(flight_id))
    }

    fn guarded(&self, record: &FlightRecord) -> ReservationResult<Flight> {
        record.decode().inspect_err(|e| {
            warn!("Refusing to touch inventory of flight {}: {}", record.id, e);
        })
    }

    async fn authorized_booking(&self, booking_id: Uuid, caller: &Caller) -> ReservationResult<Booking> {
        let booking = self
            .store
            .get_booking(booking_id)
            .await
            .map_err(ReservationError::store)?
            .ok_or(ReservationError::BookingNotFound(booking_id))?;

        if !caller.may_act_for(booking.user_id) {
            warn!("User {} denied access to booking {}", caller.user_id, booking_id);
            return Err(ReservationError::Forbidden(
                "You cannot access another user's booking".to_string(),
            ));
        }
        Ok(booking)
    }

    /// Resolves the owner for display. Runs after commits, so a directory
    /// failure degrades to `user: None` instead of failing a written booking.
    async fn present(&self, booking: Booking, flight: Option<FlightSummary>) -> BookingView {
        let user = match self.users.get_user(booking.user_id).await {
            Ok(user) => user,
            Err(e) => {
                warn!("Could not resolve owner {} of booking {}: {}", booking.user_id, booking.id, e);
                None
            }
        };

        BookingView { flight, user, booking }
    }

    async fn raise_alert(&self, flight_id: Uuid, detail: &str) {
        error!("INVENTORY CORRUPTION on flight {}: {}", flight_id, detail);
        self.emit(
            topics::INVENTORY_ALERTS,
            &flight_id.to_string(),
            &InventoryAlertEvent {
                flight_id,
                detail: detail.to_string(),
                timestamp: Utc::now().timestamp(),
            },
        )
        .await;
    }

    async fn emit<T: Serialize>(&self, topic: &str, key: &str, event: &T) {
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to serialize {} event: {}", topic, e);
                return;
            }
        };
        if let Err(e) = self.events.publish(topic, key, &payload).await {
            warn!("Failed to publish {} event for {}: {}", topic, key, e);
        }
    }
}
