//! Quest action steps.
//!
//! Steps are fetched one at a time from the backend's cursor; the engine
//! never sees a location's full sequence up front.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::ActionPointId;
use crate::value_objects::{Coordinates, HintSet, StayDuration};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Talk,
    Stay,
    Walk,
    PhotoPuzzle,
    InputPuzzle,
    LocationPuzzle,
}

impl ActionType {
    pub fn puzzle_kind(self) -> Option<PuzzleKind> {
        match self {
            ActionType::PhotoPuzzle => Some(PuzzleKind::Photo),
            ActionType::InputPuzzle => Some(PuzzleKind::Input),
            ActionType::LocationPuzzle => Some(PuzzleKind::Location),
            ActionType::Talk | ActionType::Stay | ActionType::Walk => None,
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionType::Talk => "TALK",
            ActionType::Stay => "STAY",
            ActionType::Walk => "WALK",
            ActionType::PhotoPuzzle => "PHOTO_PUZZLE",
            ActionType::InputPuzzle => "INPUT_PUZZLE",
            ActionType::LocationPuzzle => "LOCATION_PUZZLE",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PuzzleKind {
    Photo,
    Input,
    Location,
}

impl PuzzleKind {
    pub fn action_type(self) -> ActionType {
        match self {
            PuzzleKind::Photo => ActionType::PhotoPuzzle,
            PuzzleKind::Input => ActionType::InputPuzzle,
            PuzzleKind::Location => ActionType::LocationPuzzle,
        }
    }
}

/// Type-specific content of a step.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionPayload {
    Talk {
        dialogue: String,
    },
    Stay {
        duration: StayDuration,
    },
    Walk {
        step_goal: u32,
    },
    Puzzle {
        kind: PuzzleKind,
        question: String,
        keywords: Vec<String>,
        /// Location puzzles only: where the answer must be given from.
        target: Option<Coordinates>,
    },
}

impl ActionPayload {
    pub fn action_type(&self) -> ActionType {
        match self {
            ActionPayload::Talk { .. } => ActionType::Talk,
            ActionPayload::Stay { .. } => ActionType::Stay,
            ActionPayload::Walk { .. } => ActionType::Walk,
            ActionPayload::Puzzle { kind, .. } => kind.action_type(),
        }
    }
}

/// One unit of quest content at a location.
///
/// # Invariants
///
/// - `sequence` is 1-based.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionStep {
    action_point_id: ActionPointId,
    sequence: u32,
    payload: ActionPayload,
    end_of_action: bool,
    hints: [Option<String>; 3],
}

impl ActionStep {
    /// # Errors
    ///
    /// `DomainError::Validation` if `sequence` is zero.
    pub fn new(
        action_point_id: ActionPointId,
        sequence: u32,
        payload: ActionPayload,
        end_of_action: bool,
    ) -> Result<Self, DomainError> {
        if sequence == 0 {
            return Err(DomainError::validation("action sequence is 1-based"));
        }
        Ok(Self {
            action_point_id,
            sequence,
            payload,
            end_of_action,
            hints: Default::default(),
        })
    }

    pub fn with_hints(mut self, hints: [Option<String>; 3]) -> Self {
        self.hints = hints;
        self
    }

    #[inline]
    pub fn action_point_id(&self) -> &ActionPointId {
        &self.action_point_id
    }

    #[inline]
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    #[inline]
    pub fn payload(&self) -> &ActionPayload {
        &self.payload
    }

    #[inline]
    pub fn action_type(&self) -> ActionType {
        self.payload.action_type()
    }

    /// Last step at the current location.
    #[inline]
    pub fn end_of_action(&self) -> bool {
        self.end_of_action
    }

    pub fn is_puzzle(&self) -> bool {
        matches!(self.payload, ActionPayload::Puzzle { .. })
    }

    /// Fresh hint ladder for puzzle steps; `None` for the other types.
    pub fn hint_set(&self) -> Option<HintSet> {
        self.is_puzzle().then(|| {
            HintSet::new(
                self.action_point_id.clone(),
                [
                    self.hints[0].is_some(),
                    self.hints[1].is_some(),
                    self.hints[2].is_some(),
                ],
            )
        })
    }
}
