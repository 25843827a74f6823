//! Application services
//!
//! The location-gated progression engine. Services depend on port traits,
//! not concrete infrastructure implementations.

pub mod action_progression;
pub mod background_notifier;
pub mod geo_sampler;
pub mod hint_ladder;
pub mod local_state_store;
pub mod play_session_machine;
pub mod session;

pub use action_progression::{
    ActionProgressionEngine, ActiveStep, AnswerOutcome, ProgressState, StepOutcome, StepProgress,
    StepSignal,
};
pub use background_notifier::{BackgroundNotifier, Reentry, ReentryScreen};
pub use geo_sampler::{GeoSampler, GeofenceLock};
pub use hint_ladder::{HintLadder, HintPurchaseOutcome};
pub use local_state_store::{KnownRecord, LocalStateStore, RunningTargetIndex};
pub use play_session_machine::{PlaySessionMachine, TransitionOutcome};
pub use session::{PursuitThresholds, SessionContext};
