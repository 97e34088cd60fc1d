mod error;
mod mutations;
mod queries;
mod roster;
mod scoring;

pub use error::EngineError;
pub use scoring::{score_history, NO_HISTORY_SCORE};

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::catalog::CourtCatalog;
use crate::directory::Identity;
use crate::model::*;
use crate::store::RecordStore;

pub(crate) fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as Ms
}

/// The court slot allocation engine. Stateless over the record store except
/// for the per-court lock registry that serializes mutating operations.
///
/// Every mutation (`join`, `cancel`, `settle`, `move_participant`) runs its
/// whole read-decide-write sequence under the owning court's mutex, so
/// capacity checks and slot assignment are atomic with respect to each other
/// within one process. Deadline settlement is lazy: it runs when a post-
/// deadline `join`, roster build, or explicit `settle` call reaches the court,
/// never on a timer.
pub struct Engine {
    store: Arc<dyn RecordStore>,
    catalog: Arc<dyn CourtCatalog>,
    identity: Arc<dyn Identity>,
    locks: DashMap<CourtId, Arc<Mutex<()>>>,
    /// Last issued claim timestamp. `created_at` is the sole ordering
    /// tie-breaker, so timestamps handed out by one engine must be distinct
    /// even when calls land within the same millisecond.
    clock: AtomicI64,
}

impl Engine {
    pub fn new(
        store: Arc<dyn RecordStore>,
        catalog: Arc<dyn CourtCatalog>,
        identity: Arc<dyn Identity>,
    ) -> Self {
        Self {
            store,
            catalog,
            identity,
            locks: DashMap::new(),
            clock: AtomicI64::new(0),
        }
    }

    /// Serialization point for all mutations on one court.
    pub(super) fn court_lock(&self, court_id: CourtId) -> Arc<Mutex<()>> {
        self.locks.entry(court_id).or_default().clone()
    }

    /// Wall clock, nudged forward so that no two calls observe the same value.
    pub(super) fn tick(&self) -> Ms {
        let now = now_ms();
        let prev = self
            .clock
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        now.max(prev + 1)
    }

    pub(super) async fn require_court(&self, court_id: CourtId) -> Result<Court, EngineError> {
        self.catalog
            .court(court_id)
            .await?
            .ok_or(EngineError::NotFound(court_id))
    }

    pub(super) async fn court_bookings(&self, court_id: CourtId) -> Result<Vec<Booking>, EngineError> {
        Ok(self.store.query(BookingFilter::court(court_id)).await?)
    }

    /// Next slot in the `max(confirmed) + 1` sequence; `0` on an empty court.
    /// Gaps left by cancellations are not reused here.
    pub(super) fn next_slot(confirmed: &[&Booking]) -> u32 {
        confirmed
            .iter()
            .filter_map(|b| b.slot)
            .max()
            .map_or(0, |s| s + 1)
    }
}
