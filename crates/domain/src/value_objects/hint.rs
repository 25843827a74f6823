//! Hint ladder state for a puzzle step.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::ActionPointId;

/// One of the three hint positions, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct HintSlot(u8);

impl HintSlot {
    pub const MAX: u8 = 3;
    pub const FIRST: HintSlot = HintSlot(1);
    pub const ALL: [HintSlot; 3] = [HintSlot(1), HintSlot(2), HintSlot(3)];

    /// # Errors
    ///
    /// `DomainError::Validation` unless `index` is 1, 2 or 3.
    pub fn new(index: u8) -> Result<Self, DomainError> {
        if (1..=Self::MAX).contains(&index) {
            Ok(Self(index))
        } else {
            Err(DomainError::validation(format!(
                "hint slot must be 1..={}, got {}",
                Self::MAX,
                index
            )))
        }
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn previous(self) -> Option<HintSlot> {
        (self.0 > 1).then(|| HintSlot(self.0 - 1))
    }

    fn position(self) -> usize {
        usize::from(self.0 - 1)
    }
}

impl fmt::Display for HintSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u8> for HintSlot {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<HintSlot> for u8 {
    fn from(slot: HintSlot) -> u8 {
        slot.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HintState {
    #[default]
    Locked,
    Unlocked(String),
}

/// Three hint slots tied to one puzzle step.
///
/// # Invariants
///
/// - Slot *k* is unlocked only if slot *k-1* is unlocked.
/// - An unlocked slot never returns to locked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HintSet {
    action_point_id: ActionPointId,
    offered: [bool; 3],
    slots: [HintState; 3],
}

impl HintSet {
    /// `offered[k]` tells whether the step authored a hint in slot k+1.
    pub fn new(action_point_id: ActionPointId, offered: [bool; 3]) -> Self {
        Self {
            action_point_id,
            offered,
            slots: Default::default(),
        }
    }

    pub fn action_point_id(&self) -> &ActionPointId {
        &self.action_point_id
    }

    pub fn is_offered(&self, slot: HintSlot) -> bool {
        self.offered[slot.position()]
    }

    pub fn is_unlocked(&self, slot: HintSlot) -> bool {
        matches!(self.slots[slot.position()], HintState::Unlocked(_))
    }

    pub fn state(&self, slot: HintSlot) -> &HintState {
        &self.slots[slot.position()]
    }

    pub fn content(&self, slot: HintSlot) -> Option<&str> {
        match &self.slots[slot.position()] {
            HintState::Unlocked(content) => Some(content.as_str()),
            HintState::Locked => None,
        }
    }

    /// Slot 1 is always purchasable; slot k requires slot k-1 unlocked.
    pub fn can_purchase(&self, slot: HintSlot) -> bool {
        slot.previous().map_or(true, |prev| self.is_unlocked(prev))
    }

    /// Record purchased content.
    ///
    /// # Errors
    ///
    /// `DomainError::InvalidStateTransition` if the previous slot is locked.
    pub fn unlock(&mut self, slot: HintSlot, content: impl Into<String>) -> Result<(), DomainError> {
        if !self.can_purchase(slot) {
            return Err(DomainError::invalid_state_transition(format!(
                "hint {} requires hint {} first",
                slot,
                slot.index() - 1
            )));
        }
        if !self.is_unlocked(slot) {
            self.slots[slot.position()] = HintState::Unlocked(content.into());
        }
        Ok(())
    }

    /// Carry over slots already bought for the same step. Returns how many
    /// slots were restored; a set for another step restores nothing.
    pub fn restore_from(&mut self, earlier: &HintSet) -> usize {
        if earlier.action_point_id != self.action_point_id {
            return 0;
        }
        let mut restored = 0;
        for slot in HintSlot::ALL {
            let Some(content) = earlier.content(slot) else {
                break;
            };
            if !self.is_unlocked(slot) && self.unlock(slot, content).is_ok() {
                restored += 1;
            }
        }
        restored
    }
}
