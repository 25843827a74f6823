//! Request and response bodies for transition, answer-check and hint calls.

use geoquest_domain::{ActionPointId, ActionType, Coordinates, EntityId, HintSlot, PuzzleKind};
use serde::{Deserialize, Serialize};

/// Body of every status transition call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    pub entity_id: EntityId,
    pub latitude: f64,
    pub longitude: f64,
}

impl TransitionRequest {
    pub fn new(entity_id: EntityId, at: Coordinates) -> Self {
        Self {
            entity_id,
            latitude: at.latitude,
            longitude: at.longitude,
        }
    }
}

/// A puzzle answer as captured on the device.
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    Photo {
        file_name: String,
        content_type: String,
        bytes: Vec<u8>,
    },
    Text(String),
    Location(Coordinates),
}

impl Answer {
    pub fn puzzle_kind(&self) -> PuzzleKind {
        match self {
            Answer::Photo { .. } => PuzzleKind::Photo,
            Answer::Text(_) => PuzzleKind::Input,
            Answer::Location(_) => PuzzleKind::Location,
        }
    }
}

/// Answer-check submission for the current puzzle step.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerSubmission {
    pub action_point_id: ActionPointId,
    pub answer: Answer,
}

impl AnswerSubmission {
    pub fn action_type(&self) -> ActionType {
        self.answer.puzzle_kind().action_type()
    }

    /// Plain fields for non-photo answers; photo answers go out as multipart.
    pub fn json_fields(&self) -> serde_json::Value {
        let mut body = serde_json::json!({
            "actionType": self.action_type(),
            "actionPointId": self.action_point_id,
        });
        match &self.answer {
            Answer::Text(text) => body["answer"] = serde_json::Value::from(text.as_str()),
            Answer::Location(at) => {
                body["latitude"] = serde_json::Value::from(at.latitude);
                body["longitude"] = serde_json::Value::from(at.longitude);
            }
            Answer::Photo { .. } => {}
        }
        body
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerVerdict {
    pub answered: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HintPurchaseRequest {
    pub action_point_id: ActionPointId,
    pub hint_index: HintSlot,
}

/// Either unlocked content or a server-side refusal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintPurchaseResponse {
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_answer_serializes_coordinates() {
        let submission = AnswerSubmission {
            action_point_id: ActionPointId::from("ap-3"),
            answer: Answer::Location(Coordinates::new(37.1, 127.2).unwrap()),
        };
        let body = submission.json_fields();
        assert_eq!(body["actionType"], "LOCATION_PUZZLE");
        assert_eq!(body["actionPointId"], "ap-3");
        assert_eq!(body["latitude"], 37.1);
    }

    #[test]
    fn hint_request_uses_backend_field_names() {
        let request = HintPurchaseRequest {
            action_point_id: ActionPointId::from("ap-3"),
            hint_index: HintSlot::new(2).unwrap(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, serde_json::json!({"actionPointId": "ap-3", "hintIndex": 2}));
    }
}
