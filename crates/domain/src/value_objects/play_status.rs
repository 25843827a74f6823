//! Play-session status and its transition table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Backend-owned status of one (player, entity) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlaySessionStatus {
    Available,
    Pending,
    Playing,
    Cleared,
}

impl PlaySessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, PlaySessionStatus::Cleared)
    }

    /// Lower-case path segment used by the transition endpoints.
    pub fn path_segment(self) -> &'static str {
        match self {
            PlaySessionStatus::Available => "available",
            PlaySessionStatus::Pending => "pending",
            PlaySessionStatus::Playing => "playing",
            PlaySessionStatus::Cleared => "cleared",
        }
    }
}

impl fmt::Display for PlaySessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaySessionStatus::Available => write!(f, "AVAILABLE"),
            PlaySessionStatus::Pending => write!(f, "PENDING"),
            PlaySessionStatus::Playing => write!(f, "PLAYING"),
            PlaySessionStatus::Cleared => write!(f, "CLEARED"),
        }
    }
}

impl FromStr for PlaySessionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AVAILABLE" => Ok(Self::Available),
            "PENDING" => Ok(Self::Pending),
            "PLAYING" => Ok(Self::Playing),
            "CLEARED" => Ok(Self::Cleared),
            other => Err(DomainError::parse(format!("Unknown play status: {}", other))),
        }
    }
}

/// What caused a transition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionTrigger {
    /// Player came within the available radius of an untracked entity.
    EnteredAvailableRadius,
    /// Player picked the pursuit from a list (or a notification re-entry did).
    Selected,
    /// Player came back within the activation radius of a paused pursuit.
    ReenteredActivationRadius,
    /// Play screen left while outside arrival but inside the trackable radius.
    Backgrounded,
    /// Player is at the final goal and nothing remains to be done there.
    ReachedFinalArrival,
    /// Player moved out of the available radius of an AVAILABLE entity.
    LeftAvailableRadius,
}

/// Result of a table lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTransition {
    To(PlaySessionStatus),
    /// Entity leaves the locally tracked set.
    Drop,
}

/// Transition table. `from == None` is the implicit untracked state.
///
/// # Errors
///
/// `DomainError::InvalidStateTransition` for every pair not in the table,
/// including every pair whose source is `Cleared`.
pub fn next_status(
    from: Option<PlaySessionStatus>,
    trigger: SessionTrigger,
) -> Result<SessionTransition, DomainError> {
    use PlaySessionStatus::*;
    use SessionTrigger::*;

    let transition = match (from, trigger) {
        (Some(Cleared), _) => None,
        (None, EnteredAvailableRadius) => Some(SessionTransition::To(Available)),
        (Some(Available), Selected) => Some(SessionTransition::To(Playing)),
        (Some(Pending), Selected | ReenteredActivationRadius) => {
            Some(SessionTransition::To(Playing))
        }
        (Some(Playing), Backgrounded) => Some(SessionTransition::To(Pending)),
        (Some(Playing | Available), ReachedFinalArrival) => Some(SessionTransition::To(Cleared)),
        (Some(Available), LeftAvailableRadius) => Some(SessionTransition::Drop),
        _ => None,
    };

    transition.ok_or_else(|| {
        let from = from.map_or_else(|| "UNTRACKED".to_string(), |s| s.to_string());
        DomainError::invalid_state_transition(format!("{} on {:?}", from, trigger))
    })
}
