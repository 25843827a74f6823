//! Current action detail as returned by the quest cursor.

use geoquest_domain::{
    ActionPayload, ActionPointId, ActionStep, ActionType, Coordinates, DomainError, PuzzleKind,
    StayDuration,
};
use serde::{Deserialize, Serialize};

/// Wire form of one action step. Type-specific fields are optional and only
/// the ones matching `action_type` are read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDetail {
    pub action_point_id: ActionPointId,
    pub sequence: u32,
    pub action_type: ActionType,
    #[serde(default)]
    pub end_action: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialogue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minute: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub walking_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint3: Option<String>,
}

impl ActionDetail {
    /// Minimal detail for a given type; used by fixtures and tests.
    pub fn new(action_point_id: impl Into<ActionPointId>, sequence: u32, action_type: ActionType) -> Self {
        Self {
            action_point_id: action_point_id.into(),
            sequence,
            action_type,
            end_action: false,
            dialogue: None,
            day: None,
            hour: None,
            minute: None,
            walking_count: None,
            question: None,
            keywords: Vec::new(),
            latitude: None,
            longitude: None,
            hint1: None,
            hint2: None,
            hint3: None,
        }
    }

    fn payload(&self) -> Result<ActionPayload, DomainError> {
        let payload = match self.action_type {
            ActionType::Talk => ActionPayload::Talk {
                dialogue: self.dialogue.clone().unwrap_or_default(),
            },
            ActionType::Stay => ActionPayload::Stay {
                duration: StayDuration::new(
                    self.day.unwrap_or(0),
                    self.hour.unwrap_or(0),
                    self.minute.unwrap_or(0),
                ),
            },
            ActionType::Walk => ActionPayload::Walk {
                step_goal: self.walking_count.ok_or_else(|| {
                    DomainError::validation("WALK step without walkingCount")
                })?,
            },
            ActionType::PhotoPuzzle | ActionType::InputPuzzle | ActionType::LocationPuzzle => {
                let kind = self
                    .action_type
                    .puzzle_kind()
                    .unwrap_or(PuzzleKind::Input);
                let target = match (kind, self.latitude, self.longitude) {
                    (PuzzleKind::Location, Some(lat), Some(lon)) => {
                        Some(Coordinates::new(lat, lon)?)
                    }
                    (PuzzleKind::Location, _, _) => {
                        return Err(DomainError::validation(
                            "LOCATION_PUZZLE step without target coordinates",
                        ))
                    }
                    _ => None,
                };
                ActionPayload::Puzzle {
                    kind,
                    question: self.question.clone().unwrap_or_default(),
                    keywords: self.keywords.clone(),
                    target,
                }
            }
        };
        Ok(payload)
    }
}

impl TryFrom<ActionDetail> for ActionStep {
    type Error = DomainError;

    fn try_from(detail: ActionDetail) -> Result<Self, Self::Error> {
        let payload = detail.payload()?;
        let step = ActionStep::new(
            detail.action_point_id,
            detail.sequence,
            payload,
            detail.end_action,
        )?;
        Ok(step.with_hints([detail.hint1, detail.hint2, detail.hint3]))
    }
}
