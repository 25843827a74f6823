//! GeoQuest domain layer.
//!
//! Pure types and rules for location-gated play: coordinates and geofence
//! classification, the play-session status table, quest action steps, the
//! hint ladder and the persisted resume pointer. Nothing in this crate does
//! I/O; the player crate drives these types from its services.

pub mod entities;
pub mod error;
pub mod ids;
pub mod value_objects;

pub use entities::{
    ActionPayload, ActionStep, ActionType, PlayRecord, PlayTarget, PursuitKind, PuzzleKind,
    QuestLocation, ResumePointer,
};
pub use error::DomainError;
pub use ids::{ActionPointId, EntityId, LocationId, PlayRecordId, SessionHandle};
pub use value_objects::{
    next_status, Coordinates, Countdown, CountdownTick, GeofenceClass, GeofenceEvaluator,
    GeofenceReading, HintSet, HintSlot, HintState, MotionSample, PlaySessionStatus,
    PositionSample, Reward, SessionTransition, SessionTrigger, StayDuration, StepDetector,
    StepDetectorConfig, Threshold, ThresholdSet,
};
