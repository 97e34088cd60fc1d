use std::cmp::Reverse;

use tracing::{debug, info};

use crate::model::*;
use crate::observability;

use super::{now_ms, Engine, EngineError};

impl Engine {
    /// Claim a spot on a court. On capacity-limited FCFS courts (and priority
    /// courts whose deadline has passed, which settle lazily first) the claim
    /// is confirmed into the next free slot or waitlisted; on pre-deadline
    /// priority courts it stays pending until settlement — unless a waitlist
    /// already exists, in which case the claim joins the back of it so the
    /// waitlist's FCFS order stays intact.
    pub async fn join(&self, court_id: CourtId, user_id: &str) -> Result<Booking, EngineError> {
        let court = self.require_court(court_id).await?;
        let lock = self.court_lock(court_id);
        let _guard = lock.lock().await;
        let now = self.tick();

        if court.deadline_passed(now) {
            self.settle_locked(&court, now).await?;
        }

        let mine = self
            .store
            .query(BookingFilter {
                court_id: Some(court_id),
                user_id: Some(user_id.to_string()),
                state: None,
            })
            .await?;
        if !mine.is_empty() {
            return Err(EngineError::DuplicateClaim {
                user_id: user_id.to_string(),
                court_id,
            });
        }

        if court.kind == CourtKind::Unbounded {
            let booking = Booking::new(user_id.to_string(), court_id, AdmissionState::Going, now);
            self.store.create(booking.clone()).await?;
            metrics::counter!(observability::JOINS_TOTAL, "outcome" => "going").increment(1);
            debug!(%court_id, user_id, "joined unbounded court");
            return Ok(booking);
        }

        let bookings = self.court_bookings(court_id).await?;
        let confirmed: Vec<&Booking> = bookings
            .iter()
            .filter(|b| b.state == AdmissionState::Confirmed)
            .collect();
        let has_waitlist = bookings
            .iter()
            .any(|b| b.state == AdmissionState::Waitlisted);

        let mut booking = Booking::new(user_id.to_string(), court_id, AdmissionState::Pending, now);
        let outcome;

        if court.policy == AdmissionPolicy::Priority && !court.deadline_passed(now) {
            // Capacity is enforced at settlement, not here; the one exception
            // is an already-populated waitlist, which new claims must not skip.
            if has_waitlist {
                booking.state = AdmissionState::Waitlisted;
                outcome = "waitlisted";
            } else {
                outcome = "pending";
            }
        } else if (confirmed.len() as u32) < court.capacity {
            booking.state = AdmissionState::Confirmed;
            booking.slot = Some(Self::next_slot(&confirmed));
            outcome = "confirmed";
        } else {
            booking.state = AdmissionState::Waitlisted;
            outcome = "waitlisted";
        }

        self.store.create(booking.clone()).await?;
        metrics::counter!(observability::JOINS_TOTAL, "outcome" => outcome).increment(1);
        info!(%court_id, user_id, outcome, slot = ?booking.slot, "join");
        Ok(booking)
    }

    /// Delete a claim. If it held a slot, the earliest-created waitlisted
    /// claim is promoted into the freed slot; delete and promotion commit as
    /// one atomic batch. Without a waitlist the slot is simply vacated — the
    /// gap persists until an administrator reorder compacts it.
    pub async fn cancel(&self, booking_id: BookingId) -> Result<(), EngineError> {
        let booking = self
            .store
            .get(booking_id)
            .await?
            .ok_or(EngineError::NotFound(booking_id))?;
        let court_id = booking.court_id;
        let lock = self.court_lock(court_id);
        let _guard = lock.lock().await;

        // Re-read under the lock; the record may have moved since the lookup.
        let booking = self
            .store
            .get(booking_id)
            .await?
            .ok_or(EngineError::NotFound(booking_id))?;
        let now = self.tick();

        let mut ops = vec![BatchOp::Delete(booking_id)];
        let mut promoted: Option<BookingId> = None;

        if booking.state == AdmissionState::Confirmed
            && let Some(freed) = booking.slot {
                let bookings = self.court_bookings(court_id).await?;
                if bookings
                    .iter()
                    .any(|b| b.id != booking_id && b.slot == Some(freed))
                {
                    return Err(EngineError::CapacityRace(court_id));
                }
                let head = bookings
                    .iter()
                    .filter(|b| b.state == AdmissionState::Waitlisted)
                    .min_by_key(|b| (b.created_at, b.id));
                if let Some(head) = head {
                    ops.push(BatchOp::Update(
                        head.id,
                        BookingPatch {
                            state: Some(AdmissionState::Confirmed),
                            slot: Some(Some(freed)),
                            updated_at: Some(now),
                        },
                    ));
                    promoted = Some(head.id);
                }
            }

        self.store.atomic_batch(ops).await?;
        metrics::counter!(observability::CANCELLATIONS_TOTAL).increment(1);
        if promoted.is_some() {
            metrics::counter!(observability::PROMOTIONS_TOTAL).increment(1);
        }
        info!(%court_id, %booking_id, ?promoted, "cancel");
        Ok(())
    }

    /// Settle a priority court whose deadline has passed. Lazy and idempotent:
    /// callers trigger it on join and roster reads, never on a timer, and a
    /// second call finds no pending claims and does nothing.
    pub async fn settle(&self, court_id: CourtId) -> Result<(), EngineError> {
        let court = self.require_court(court_id).await?;
        let lock = self.court_lock(court_id);
        let _guard = lock.lock().await;
        self.settle_locked(&court, now_ms()).await
    }

    /// Core settlement step. Caller must hold the court lock.
    pub(super) async fn settle_locked(&self, court: &Court, now: Ms) -> Result<(), EngineError> {
        if !court.deadline_passed(now) {
            debug!(court_id = %court.id, "settle: deadline not passed, no-op");
            return Ok(());
        }

        let bookings = self.court_bookings(court.id).await?;
        let pending: Vec<&Booking> = bookings
            .iter()
            .filter(|b| b.state == AdmissionState::Pending)
            .collect();
        if pending.is_empty() {
            return Ok(());
        }

        let confirmed: Vec<&Booking> = bookings
            .iter()
            .filter(|b| b.state == AdmissionState::Confirmed)
            .collect();
        let mut seen = std::collections::HashSet::new();
        for b in &confirmed {
            if let Some(slot) = b.slot
                && !seen.insert(slot) {
                    return Err(EngineError::CapacityRace(court.id));
                }
        }

        let mut ranked: Vec<(i64, &Booking)> = Vec::with_capacity(pending.len());
        for b in &pending {
            let score = self.priority_score(&b.user_id, court.date).await?;
            ranked.push((score, b));
        }
        ranked.sort_by_key(|(score, b)| (Reverse(*score), b.created_at, b.id));

        let free = (court.capacity as usize).saturating_sub(confirmed.len());
        let mut slot = Self::next_slot(&confirmed);
        let mut ops = Vec::with_capacity(ranked.len());
        for (i, (score, b)) in ranked.iter().enumerate() {
            if i < free {
                debug!(court_id = %court.id, user_id = %b.user_id, score, slot, "settle: confirm");
                ops.push(BatchOp::Update(
                    b.id,
                    BookingPatch {
                        state: Some(AdmissionState::Confirmed),
                        slot: Some(Some(slot)),
                        updated_at: Some(now),
                    },
                ));
                slot += 1;
            } else {
                debug!(court_id = %court.id, user_id = %b.user_id, score, "settle: waitlist");
                ops.push(BatchOp::Update(
                    b.id,
                    BookingPatch {
                        state: Some(AdmissionState::Waitlisted),
                        slot: Some(None),
                        updated_at: Some(now),
                    },
                ));
            }
        }

        self.store.atomic_batch(ops).await?;
        metrics::counter!(observability::SETTLEMENTS_TOTAL).increment(1);
        metrics::histogram!(observability::SETTLE_PENDING_SIZE).record(pending.len() as f64);
        info!(court_id = %court.id, pending = pending.len(), free, "settled");
        Ok(())
    }

    /// Administrator reorder on a capacity-limited court. The mover takes
    /// `new_slot`; every confirmed booking whose slot lies between the origin
    /// (exclusive) and the destination (inclusive) shifts one occupied
    /// position toward the vacated origin. With only origin and destination
    /// occupied this degenerates to a swap; over a dense run it is a shift.
    /// All updates commit as one atomic batch.
    pub async fn move_participant(
        &self,
        court_id: CourtId,
        user_id: &str,
        new_slot: u32,
    ) -> Result<(), EngineError> {
        if !self.identity.current_user().is_administrator {
            return Err(EngineError::NotAuthorized);
        }
        let court = self.require_court(court_id).await?;
        if !court.is_capacity_limited() {
            return Err(EngineError::NotCapacityLimited(court_id));
        }

        let lock = self.court_lock(court_id);
        let _guard = lock.lock().await;
        let now = self.tick();

        let bookings = self.court_bookings(court_id).await?;
        let confirmed: Vec<&Booking> = bookings
            .iter()
            .filter(|b| b.state == AdmissionState::Confirmed)
            .collect();
        let mover = confirmed
            .iter()
            .find(|b| b.user_id == user_id)
            .ok_or(EngineError::NotFound(court_id))?;
        let Some(old_slot) = mover.slot else {
            return Err(EngineError::CapacityRace(court_id));
        };
        if new_slot == old_slot {
            return Ok(());
        }

        let moving_up = new_slot > old_slot;
        let mut between: Vec<(u32, BookingId)> = confirmed
            .iter()
            .filter(|b| b.id != mover.id)
            .filter_map(|b| b.slot.map(|s| (s, b.id)))
            .filter(|(s, _)| {
                if moving_up {
                    *s > old_slot && *s <= new_slot
                } else {
                    *s >= new_slot && *s < old_slot
                }
            })
            .collect();
        between.sort_by_key(|(s, _)| *s);
        if !moving_up {
            between.reverse();
        }

        let mut ops = vec![BatchOp::Update(
            mover.id,
            BookingPatch {
                state: None,
                slot: Some(Some(new_slot)),
                updated_at: Some(now),
            },
        )];
        // Walk outward from the origin; each shifted booking inherits the
        // slot value of its neighbor toward the origin.
        let mut vacated = old_slot;
        for (slot, id) in between {
            ops.push(BatchOp::Update(
                id,
                BookingPatch {
                    state: None,
                    slot: Some(Some(vacated)),
                    updated_at: Some(now),
                },
            ));
            vacated = slot;
        }

        self.store.atomic_batch(ops).await?;
        metrics::counter!(observability::REORDERS_TOTAL).increment(1);
        info!(%court_id, user_id, old_slot, new_slot, "reorder");
        Ok(())
    }
}
