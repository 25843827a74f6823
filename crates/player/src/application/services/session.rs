//! Explicit context for the one pursuit currently being followed.

use geoquest_domain::{
    Coordinates, DomainError, EntityId, GeofenceEvaluator, GeofenceReading, PlayTarget,
    PositionSample, PursuitKind, ResumePointer, SessionHandle, ThresholdSet,
};

/// Per-kind geofence thresholds, normally loaded from settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PursuitThresholds {
    pub treasure: ThresholdSet,
    pub quest: ThresholdSet,
}

impl PursuitThresholds {
    pub fn for_kind(&self, kind: PursuitKind) -> ThresholdSet {
        match kind {
            PursuitKind::Treasure => self.treasure,
            PursuitKind::Quest => self.quest,
        }
    }
}

impl Default for PursuitThresholds {
    fn default() -> Self {
        Self {
            treasure: PursuitKind::Treasure.default_thresholds(),
            quest: PursuitKind::Quest.default_thresholds(),
        }
    }
}

/// The active target plus the position frozen when its geofence locked.
///
/// Passed by reference into the machine and engine entry points; the local
/// state store is its only persistence boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    target: PlayTarget,
    thresholds: ThresholdSet,
    locked: Option<PositionSample>,
}

impl SessionContext {
    pub fn new(target: PlayTarget, thresholds: ThresholdSet) -> Self {
        Self {
            target,
            thresholds,
            locked: None,
        }
    }

    pub fn target(&self) -> &PlayTarget {
        &self.target
    }

    pub fn kind(&self) -> PursuitKind {
        self.target.kind
    }

    pub fn entity_id(&self) -> &EntityId {
        &self.target.entity_id
    }

    pub fn session_handle(&self) -> Option<&SessionHandle> {
        self.target.session_handle.as_ref()
    }

    pub fn thresholds(&self) -> &ThresholdSet {
        &self.thresholds
    }

    pub fn evaluate(&self, sample: &PositionSample) -> GeofenceReading {
        GeofenceEvaluator::evaluate(&sample.coordinates, &self.target.goal, &self.thresholds)
    }

    /// Freeze the coordinates used by the next backend call.
    pub fn lock(&mut self, sample: PositionSample) {
        self.locked = Some(sample);
    }

    pub fn locked_position(&self) -> Option<&PositionSample> {
        self.locked.as_ref()
    }

    /// Coordinates for the next backend call. `None` until a sample locks.
    pub fn call_coordinates(&self) -> Option<Coordinates> {
        self.locked.as_ref().map(|sample| sample.coordinates)
    }

    /// Move on to the next quest location; the old lock no longer applies.
    pub fn retarget(&mut self, pointer: &ResumePointer) -> Result<(), DomainError> {
        self.target.retarget(pointer)?;
        self.locked = None;
        Ok(())
    }

    pub fn into_target(self) -> PlayTarget {
        self.target
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use geoquest_domain::{GeofenceClass, PlayRecordId};

    use super::*;

    fn target() -> PlayTarget {
        PlayTarget {
            target_id: PlayRecordId::from("rec-1"),
            entity_id: EntityId::from("quest-7"),
            kind: PursuitKind::Quest,
            goal: Coordinates::new(37.5665, 126.9780).unwrap(),
            title: "Old Town".into(),
            reward: None,
            session_handle: Some(SessionHandle::from("s-1")),
        }
    }

    #[test]
    fn call_coordinates_come_only_from_a_locked_sample() {
        let mut ctx = SessionContext::new(target(), ThresholdSet::QUEST);
        assert_eq!(ctx.call_coordinates(), None);

        let near = Coordinates::new(37.5666, 126.9780).unwrap();
        ctx.lock(PositionSample::new(near, Some(5.0), Utc::now()));
        assert_eq!(ctx.call_coordinates(), Some(near));
        assert_eq!(ctx.evaluate(ctx.locked_position().unwrap()).class, GeofenceClass::Arrival);
    }

    #[test]
    fn retarget_moves_goal_and_drops_lock() {
        let mut ctx = SessionContext::new(target(), ThresholdSet::QUEST);
        ctx.lock(PositionSample::new(target().goal, None, Utc::now()));

        let pointer = ResumePointer {
            session_handle: SessionHandle::from("s-1"),
            entity_id: EntityId::from("quest-7"),
            title: "Old Town".into(),
            next_location_name: "Gate".into(),
            next_latitude: 37.57,
            next_longitude: 126.98,
        };
        ctx.retarget(&pointer).unwrap();

        assert!(ctx.locked_position().is_none());
        assert_eq!(ctx.target().goal, Coordinates::new(37.57, 126.98).unwrap());
    }

    #[test]
    fn thresholds_follow_kind() {
        let thresholds = PursuitThresholds::default();
        assert_eq!(thresholds.for_kind(PursuitKind::Treasure).arrival_m, 1.5);
        assert_eq!(thresholds.for_kind(PursuitKind::Quest).arrival_m, 15.0);
    }
}
