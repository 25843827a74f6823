//! Pursuits and the play records the backend keeps for them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entities::ResumePointer;
use crate::error::DomainError;
use crate::ids::{EntityId, PlayRecordId, SessionHandle};
use crate::value_objects::{Coordinates, PlaySessionStatus, Reward, ThresholdSet};

/// Treasure hunts are single-location finds; quests are ordered,
/// multi-location, multi-step experiences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PursuitKind {
    Treasure,
    Quest,
}

impl PursuitKind {
    pub const ALL: [PursuitKind; 2] = [PursuitKind::Treasure, PursuitKind::Quest];

    /// Resource segment used by the play endpoints.
    pub fn resource(self) -> &'static str {
        match self {
            PursuitKind::Treasure => "treasure-hunts",
            PursuitKind::Quest => "quests",
        }
    }

    pub fn default_thresholds(self) -> ThresholdSet {
        match self {
            PursuitKind::Treasure => ThresholdSet::TREASURE,
            PursuitKind::Quest => ThresholdSet::QUEST,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PursuitKind::Treasure => "treasure",
            PursuitKind::Quest => "quest",
        }
    }
}

impl fmt::Display for PursuitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PursuitKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "treasure" | "treasure-hunt" | "treasure-hunts" => Ok(Self::Treasure),
            "quest" | "quests" => Ok(Self::Quest),
            other => Err(DomainError::parse(format!("Unknown pursuit kind: {}", other))),
        }
    }
}

/// Backend play record, as returned by every transition and list call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayRecord {
    pub id: PlayRecordId,
    pub entity_id: EntityId,
    pub status: PlaySessionStatus,
    #[serde(flatten)]
    pub goal: Coordinates,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_handle: Option<SessionHandle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward: Option<Reward>,
}

/// The one pursuit currently being followed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayTarget {
    pub target_id: PlayRecordId,
    pub entity_id: EntityId,
    pub kind: PursuitKind,
    pub goal: Coordinates,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward: Option<Reward>,
    /// Quest only: handle used to fetch the current action detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_handle: Option<SessionHandle>,
}

impl PlayTarget {
    pub fn from_record(kind: PursuitKind, record: &PlayRecord) -> Self {
        Self {
            target_id: record.id.clone(),
            entity_id: record.entity_id.clone(),
            kind,
            goal: record.goal,
            title: record.title.clone(),
            reward: record.reward.clone(),
            session_handle: record.session_handle.clone(),
        }
    }

    /// Point the target at the next quest location named by a resume pointer.
    ///
    /// # Errors
    ///
    /// `DomainError::Validation` if the pointer belongs to another entity or
    /// carries out-of-range coordinates.
    pub fn retarget(&mut self, pointer: &ResumePointer) -> Result<(), DomainError> {
        if pointer.entity_id != self.entity_id {
            return Err(DomainError::validation(format!(
                "resume pointer for {} cannot retarget {}",
                pointer.entity_id, self.entity_id
            )));
        }
        self.goal = pointer.next_goal()?;
        self.session_handle = Some(pointer.session_handle.clone());
        Ok(())
    }
}
