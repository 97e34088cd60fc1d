use ulid::Ulid;

use crate::model::{CourtId, UserId};
use crate::store::StoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The user already holds a live claim on this court; cancel first.
    DuplicateClaim { user_id: UserId, court_id: CourtId },
    NotFound(Ulid),
    /// A lost update slipped past serialization (slot already taken at commit
    /// time). Should never surface; indicates a locking bug, not a user error.
    CapacityRace(CourtId),
    NotAuthorized,
    /// Operation only makes sense on capacity-limited courts.
    NotCapacityLimited(CourtId),
    StoreUnavailable(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::DuplicateClaim { user_id, court_id } => {
                write!(f, "user {user_id} already has a live claim on court {court_id}")
            }
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::CapacityRace(court_id) => {
                write!(f, "lost update detected on court {court_id}: slot assignment raced")
            }
            EngineError::NotAuthorized => write!(f, "administrator role required"),
            EngineError::NotCapacityLimited(court_id) => {
                write!(f, "court {court_id} is not capacity-limited")
            }
            EngineError::StoreUnavailable(msg) => write!(f, "record store unavailable: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => EngineError::StoreUnavailable(msg),
            StoreError::NotFound(id) => EngineError::NotFound(id),
        }
    }
}
