use chrono::Utc;
use serde::Serialize;
use skyseat_core::guard::{inspect_flight, SchemaViolation};
use skyseat_core::repair::{plan_repair, RepairPlan};
use skyseat_core::repository::{CommitOutcome, FlightDirectory, FlightMaintenance};
use skyseat_core::{ReservationError, ReservationResult};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct RepairOutcome {
    pub flight_id: Uuid,
    pub plan: RepairPlan,
    pub applied: bool,
    /// Guard violations left after the plan is applied.
    pub remaining: Vec<SchemaViolation>,
}

/// Repairs malformed flight documents in place, guarded by the record version.
pub struct FlightRepairer<S> {
    store: Arc<S>,
    max_attempts: u32,
}

impl<S> FlightRepairer<S>
where
    S: FlightDirectory + FlightMaintenance,
{
    pub fn new(store: Arc<S>, max_attempts: u32) -> Self {
        Self { store, max_attempts: max_attempts.max(1) }
    }

    pub async fn repair(&self, flight_id: Uuid, dry_run: bool) -> ReservationResult<RepairOutcome> {
        for attempt in 1..=self.max_attempts {
            let record = self
                .store
                .get_flight(flight_id)
                .await
                .map_err(ReservationError::store)?
                .ok_or(ReservationError::FlightNotFound(flight_id))?;

            let plan = plan_repair(&record.document, Utc::now());
            let mut patched = record.document.clone();
            plan.apply_to(&mut patched);
            let remaining = inspect_flight(&patched);

            if plan.is_empty() || dry_run {
                return Ok(RepairOutcome { flight_id, plan, applied: false, remaining });
            }

            match self
                .store
                .patch_flight(flight_id, record.version, &plan.updates)
                .await
                .map_err(ReservationError::store)?
            {
                CommitOutcome::Applied => {
                    info!(
                        "Repaired flight {}: {:?}",
                        flight_id,
                        plan.updates.keys().collect::<Vec<_>>()
                    );
                    return Ok(RepairOutcome { flight_id, plan, applied: true, remaining });
                }
                CommitOutcome::Conflict => {
                    warn!("Flight {} changed during repair (attempt {}), re-planning", flight_id, attempt);
                }
            }
        }

        Err(ReservationError::Contention { flight_id, attempts: self.max_attempts })
    }
}
