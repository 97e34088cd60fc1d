use futures::future::join_all;

use crate::model::*;

use super::{now_ms, Engine, EngineError};

impl Engine {
    /// Assemble the ordered, human-readable roster for a court: confirmed
    /// claims by slot, then pending, then the waitlist ordered by claim time
    /// with 1-based positions. Triggers lazy settlement first, so a roster
    /// read after the deadline always reflects settled state.
    pub async fn build_roster(&self, court_id: CourtId) -> Result<Vec<RosterEntry>, EngineError> {
        let court = self.require_court(court_id).await?;
        {
            let lock = self.court_lock(court_id);
            let _guard = lock.lock().await;
            self.settle_locked(&court, now_ms()).await?;
        }

        let bookings = self.court_bookings(court_id).await?;

        let mut ordered: Vec<&Booking> = Vec::with_capacity(bookings.len());
        let mut confirmed: Vec<&Booking> = bookings
            .iter()
            .filter(|b| b.state == AdmissionState::Confirmed)
            .collect();
        confirmed.sort_by_key(|b| (b.slot, b.created_at));
        ordered.extend(confirmed);

        for state in [AdmissionState::Going, AdmissionState::Pending, AdmissionState::Waitlisted] {
            let mut group: Vec<&Booking> =
                bookings.iter().filter(|b| b.state == state).collect();
            group.sort_by_key(|b| (b.created_at, b.id));
            ordered.extend(group);
        }

        let names = join_all(
            ordered
                .iter()
                .map(|b| self.identity.display_name(&b.user_id)),
        )
        .await;

        let mut roster = Vec::with_capacity(ordered.len());
        let mut waitlist_position = 0u32;
        for (booking, name) in ordered.into_iter().zip(names) {
            let position = if booking.state == AdmissionState::Waitlisted {
                waitlist_position += 1;
                Some(waitlist_position)
            } else {
                None
            };
            roster.push(RosterEntry {
                user_id: booking.user_id.clone(),
                display_name: name?,
                state: booking.state,
                slot: booking.slot,
                waitlist_position: position,
            });
        }
        Ok(roster)
    }
}
