use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// Idle entries are pruned once the table grows past this size.
const PRUNE_THRESHOLD: usize = 4096;

/// Per-flight critical sections. Mutations of one flight run one at a time
/// inside this process; different flights never wait on each other.
#[derive(Default)]
pub struct FlightLocks {
    slots: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl FlightLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits at most `wait` for the flight's section; `None` on timeout.
    pub async fn acquire(&self, flight_id: Uuid, wait: Duration) -> Option<OwnedMutexGuard<()>> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            if slots.len() > PRUNE_THRESHOLD {
                slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            }
            slots.entry(flight_id).or_default().clone()
        };

        tokio::time::timeout(wait, slot.lock_owned()).await.ok()
    }

    pub fn tracked(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
