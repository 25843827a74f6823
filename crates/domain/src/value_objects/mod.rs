//! Value objects - immutable, validated building blocks of the play domain.

mod coordinates;
mod countdown;
mod geofence;
mod hint;
mod play_status;
mod reward;
mod step_detector;

pub use coordinates::{Coordinates, PositionSample, EARTH_RADIUS_M};
pub use countdown::{Countdown, CountdownTick, StayDuration};
pub use geofence::{GeofenceClass, GeofenceEvaluator, GeofenceReading, Threshold, ThresholdSet};
pub use hint::{HintSet, HintSlot, HintState};
pub use play_status::{next_status, PlaySessionStatus, SessionTransition, SessionTrigger};
pub use reward::Reward;
pub use step_detector::{MotionSample, StepDetector, StepDetectorConfig};
