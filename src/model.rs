use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds — the only time type.
pub type Ms = i64;

pub const DAY_MS: Ms = 86_400_000;

pub type CourtId = Ulid;
pub type BookingId = Ulid;
/// Opaque id issued by the external identity subsystem.
pub type UserId = String;

/// How claims against a court are admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdmissionPolicy {
    /// First come, first served — slots assigned immediately at join time.
    Fcfs,
    /// Claims stay pending until the deadline, then are ranked and settled.
    Priority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CourtKind {
    /// No slot accounting; everyone who joins is in.
    Unbounded,
    /// Fixed number of discrete slots.
    CapacityLimited,
}

/// A bookable court block. Created and edited by administrators outside this
/// crate; the engine only reads it (its deadline may pass, nothing else moves).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Court {
    pub id: CourtId,
    pub capacity: u32,
    pub policy: AdmissionPolicy,
    /// Settlement deadline, `Priority` courts only.
    pub deadline: Option<Ms>,
    pub kind: CourtKind,
    /// When the court time actually happens. Drives the priority scorer's
    /// look-back window.
    pub date: Ms,
}

impl Court {
    pub fn is_capacity_limited(&self) -> bool {
        self.kind == CourtKind::CapacityLimited
    }

    /// True when this court is priority-gated and its deadline has passed.
    pub fn deadline_passed(&self, now: Ms) -> bool {
        self.policy == AdmissionPolicy::Priority
            && self.deadline.is_some_and(|d| now >= d)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdmissionState {
    /// Unbounded courts only.
    Going,
    /// Priority courts before the deadline.
    Pending,
    /// Holds a slot.
    Confirmed,
    /// No slot; ordered by `created_at`.
    Waitlisted,
}

/// One user's claim against one court.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub user_id: UserId,
    pub court_id: CourtId,
    pub state: AdmissionState,
    /// Present iff `state == Confirmed`. Sparse: cancellations can leave gaps
    /// that persist until an administrator reorder compacts them.
    pub slot: Option<u32>,
    /// Claim timestamp — the sole tie-breaker for ordering.
    pub created_at: Ms,
    pub updated_at: Ms,
}

impl Booking {
    pub fn new(user_id: UserId, court_id: CourtId, state: AdmissionState, now: Ms) -> Self {
        Self {
            id: Ulid::new(),
            user_id,
            court_id,
            state,
            slot: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for a booking record. `slot: Some(None)` clears the slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingPatch {
    pub state: Option<AdmissionState>,
    pub slot: Option<Option<u32>>,
    pub updated_at: Option<Ms>,
}

impl BookingPatch {
    pub fn apply(&self, booking: &mut Booking) {
        if let Some(state) = self.state {
            booking.state = state;
        }
        if let Some(slot) = self.slot {
            booking.slot = slot;
        }
        if let Some(at) = self.updated_at {
            booking.updated_at = at;
        }
    }
}

/// Typed query-by-fields filter. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingFilter {
    pub court_id: Option<CourtId>,
    pub user_id: Option<UserId>,
    pub state: Option<AdmissionState>,
}

impl BookingFilter {
    pub fn court(court_id: CourtId) -> Self {
        Self { court_id: Some(court_id), ..Self::default() }
    }

    pub fn user(user_id: &str) -> Self {
        Self { user_id: Some(user_id.to_string()), ..Self::default() }
    }

    pub fn state(mut self, state: AdmissionState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn matches(&self, booking: &Booking) -> bool {
        self.court_id.is_none_or(|c| booking.court_id == c)
            && self.user_id.as_deref().is_none_or(|u| booking.user_id == u)
            && self.state.is_none_or(|s| booking.state == s)
    }
}

/// One record operation in an atomic multi-record commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Create(Booking),
    Update(BookingId, BookingPatch),
    Delete(BookingId),
}

// ── Roster projection ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub user_id: UserId,
    pub display_name: String,
    pub state: AdmissionState,
    pub slot: Option<u32>,
    /// 1-based, waitlisted entries only.
    pub waitlist_position: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booking(court_id: CourtId, user: &str, state: AdmissionState) -> Booking {
        Booking::new(user.to_string(), court_id, state, 1_000)
    }

    #[test]
    fn deadline_passed_only_for_priority() {
        let mut court = Court {
            id: Ulid::new(),
            capacity: 4,
            policy: AdmissionPolicy::Priority,
            deadline: Some(5_000),
            kind: CourtKind::CapacityLimited,
            date: 10_000,
        };
        assert!(!court.deadline_passed(4_999));
        assert!(court.deadline_passed(5_000));

        court.policy = AdmissionPolicy::Fcfs;
        assert!(!court.deadline_passed(9_999));
    }

    #[test]
    fn patch_clears_slot() {
        let court = Ulid::new();
        let mut b = booking(court, "u1", AdmissionState::Confirmed);
        b.slot = Some(3);

        let patch = BookingPatch {
            state: Some(AdmissionState::Waitlisted),
            slot: Some(None),
            updated_at: Some(2_000),
        };
        patch.apply(&mut b);
        assert_eq!(b.state, AdmissionState::Waitlisted);
        assert_eq!(b.slot, None);
        assert_eq!(b.updated_at, 2_000);
    }

    #[test]
    fn empty_patch_is_noop() {
        let court = Ulid::new();
        let mut b = booking(court, "u1", AdmissionState::Pending);
        let before = b.clone();
        BookingPatch::default().apply(&mut b);
        assert_eq!(b, before);
    }

    #[test]
    fn filter_matches_by_fields() {
        let court = Ulid::new();
        let other = Ulid::new();
        let b = booking(court, "u1", AdmissionState::Confirmed);

        assert!(BookingFilter::court(court).matches(&b));
        assert!(!BookingFilter::court(other).matches(&b));
        assert!(BookingFilter::user("u1").matches(&b));
        assert!(!BookingFilter::user("u2").matches(&b));
        assert!(BookingFilter::court(court).state(AdmissionState::Confirmed).matches(&b));
        assert!(!BookingFilter::court(court).state(AdmissionState::Pending).matches(&b));
        assert!(BookingFilter::default().matches(&b));
    }
}
