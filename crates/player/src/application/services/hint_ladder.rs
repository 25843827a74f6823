//! Strictly ordered hint purchases for the current puzzle step.
//!
//! The ladder holds the [`HintSet`] of the puzzle the engine is on. Order is
//! checked locally so an out-of-order purchase never costs a round-trip;
//! whether the player can afford a hint is the server's call.
//!
//! Bought content is also kept per action point for the life of the ladder,
//! so coming back to a puzzle after leaving it shows what was already paid
//! for instead of charging again.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use geoquest_domain::{ActionPointId, HintSet, HintSlot, HintState};

use crate::application::dto::HintPurchaseRequest;
use crate::ports::outbound::HintPort;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HintPurchaseOutcome {
    Unlocked(String),
    /// Viewing an unlocked slot; nothing was spent.
    AlreadyUnlocked(String),
    /// Buy the previous hint first.
    NeedPreviousHint,
    /// Server refused the spend; carries its message.
    InsufficientFunds(String),
    /// No puzzle active, or the step offers no hint in this slot.
    Unavailable,
    /// Another purchase is in flight.
    Ignored,
    Failed,
}

pub struct HintLadder {
    hints: Arc<dyn HintPort>,
    current: Mutex<Option<HintSet>>,
    bought: Mutex<HashMap<ActionPointId, HintSet>>,
    purchasing: AtomicBool,
}

impl HintLadder {
    pub fn new(hints: Arc<dyn HintPort>) -> Self {
        Self {
            hints,
            current: Mutex::new(None),
            bought: Mutex::new(HashMap::new()),
            purchasing: AtomicBool::new(false),
        }
    }

    /// Bind the ladder to a newly entered puzzle step, restoring any slots
    /// already bought for it.
    pub fn attach(&self, mut set: HintSet) {
        if let Some(earlier) = self.bought().get(set.action_point_id()) {
            let restored = set.restore_from(earlier);
            tracing::debug!(
                action_point_id = %set.action_point_id(),
                restored,
                "Restored bought hints"
            );
        }
        *self.lock() = Some(set);
    }

    pub fn detach(&self) {
        *self.lock() = None;
    }

    pub fn can_purchase(&self, slot: HintSlot) -> bool {
        self.lock()
            .as_ref()
            .map_or(false, |set| set.is_offered(slot) && set.can_purchase(slot))
    }

    pub fn view(&self, slot: HintSlot) -> HintState {
        self.lock()
            .as_ref()
            .map_or(HintState::Locked, |set| set.state(slot).clone())
    }

    pub async fn purchase(&self, slot: HintSlot) -> HintPurchaseOutcome {
        let action_point_id = {
            let guard = self.lock();
            let Some(set) = guard.as_ref() else {
                return HintPurchaseOutcome::Unavailable;
            };
            if let Some(content) = set.content(slot) {
                return HintPurchaseOutcome::AlreadyUnlocked(content.to_string());
            }
            if !set.is_offered(slot) {
                return HintPurchaseOutcome::Unavailable;
            }
            if !set.can_purchase(slot) {
                tracing::debug!(slot = %slot, "Hint requested out of order");
                return HintPurchaseOutcome::NeedPreviousHint;
            }
            set.action_point_id().clone()
        };

        if self
            .purchasing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return HintPurchaseOutcome::Ignored;
        }
        let request = HintPurchaseRequest {
            action_point_id: action_point_id.clone(),
            hint_index: slot,
        };
        let response = self.hints.purchase_hint(&request).await;
        self.purchasing.store(false, Ordering::Release);

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    action_point_id = %action_point_id,
                    slot = %slot,
                    error = %e,
                    "Hint purchase failed"
                );
                return HintPurchaseOutcome::Failed;
            }
        };

        match (response.hint, response.error) {
            (Some(content), _) => {
                self.remember(&action_point_id, slot, &content);
                let mut guard = self.lock();
                match guard.as_mut() {
                    Some(set) if set.action_point_id() == &action_point_id => {
                        if let Err(e) = set.unlock(slot, content.clone()) {
                            tracing::warn!(error = %e, "Purchased hint could not be cached");
                        }
                    }
                    _ => tracing::debug!("Step changed during hint purchase; not caching"),
                }
                tracing::info!(action_point_id = %action_point_id, slot = %slot, "Hint unlocked");
                HintPurchaseOutcome::Unlocked(content)
            }
            (None, Some(message)) => {
                tracing::info!(
                    action_point_id = %action_point_id,
                    slot = %slot,
                    reason = %message,
                    "Hint purchase refused"
                );
                HintPurchaseOutcome::InsufficientFunds(message)
            }
            (None, None) => {
                tracing::warn!(action_point_id = %action_point_id, "Empty hint purchase response");
                HintPurchaseOutcome::Failed
            }
        }
    }

    fn remember(&self, action_point_id: &ActionPointId, slot: HintSlot, content: &str) {
        let mut bought = self.bought();
        let set = bought
            .entry(action_point_id.clone())
            .or_insert_with(|| HintSet::new(action_point_id.clone(), [true; 3]));
        if let Err(e) = set.unlock(slot, content) {
            tracing::warn!(error = %e, "Bought hint could not be remembered");
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<HintSet>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bought(&self) -> MutexGuard<'_, HashMap<ActionPointId, HintSet>> {
        self.bought.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
