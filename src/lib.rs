//! Court slot allocation engine for capacity-limited court time.
//!
//! Decides, for a court with N slots and a set of competing claims, who gets
//! a slot, who waits, and how that assignment evolves: first-come-first-served
//! or deadline-gated priority admission, cancellation-triggered promotion, and
//! administrator reordering. Persistence, identity, and the court catalog are
//! external collaborators reached through the traits in [`store`],
//! [`directory`], and [`catalog`].

pub mod catalog;
pub mod directory;
pub mod engine;
pub mod model;
pub mod observability;
pub mod store;

pub use engine::{Engine, EngineError};
