//! Entities - identity-bearing records of the play domain.

mod action_step;
mod location;
mod play_target;
mod resume_pointer;

pub use action_step::{ActionPayload, ActionStep, ActionType, PuzzleKind};
pub use location::QuestLocation;
pub use play_target::{PlayRecord, PlayTarget, PursuitKind};
pub use resume_pointer::ResumePointer;
