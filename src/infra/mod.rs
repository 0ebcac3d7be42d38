mod action;
mod cbs;
mod conflicts;
mod error;
mod memory;
mod observer;
mod plan;
mod repair;
mod types;

pub use action::{Action, ActionKind, Deltas};
pub use cbs::CBS;
pub use conflicts::{
    Conflict, ConflictKind, ConflictMap, conflict_count, detect_conflicts, first_conflict,
    mirrored_conflict,
};
pub use error::{ClientError, LevelError, PlanError};
pub use memory::MemoryGuard;
pub use observer::{DefaultObserver, PlanObserver};
pub use plan::{AgentPath, Schedule};
pub use repair::Repairer;
pub use types::{Color, Direction, Position, UnknownColor};
