//! Play-session state machine.
//!
//! Drives AVAILABLE / PENDING / PLAYING / CLEARED per (player, entity) from
//! geofence crossings and explicit player actions. Every transition is one
//! backend call whose returned record is authoritative and is written through
//! to the local indexes before the caller sees it. Backend failures are
//! logged and leave local state untouched; the next sample or tap retries.

use std::sync::Arc;

use geoquest_domain::{
    next_status, Coordinates, DomainError, EntityId, GeofenceClass, GeofenceReading, PlayRecord,
    PlaySessionStatus, PositionSample, PursuitKind, SessionTransition, SessionTrigger, Threshold,
};

use super::local_state_store::LocalStateStore;
use super::session::{PursuitThresholds, SessionContext};
use crate::application::dto::TransitionRequest;
use crate::ports::outbound::{BackendError, PlayRecordPort};

/// Result of attempting one transition.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// The backend accepted; carries the authoritative record.
    Applied(PlayRecord),
    /// Nothing to do: no trigger, or the index already shows the target status.
    Unchanged,
    /// Dropped from the local AVAILABLE set (and deleted for treasure hunts).
    Dropped,
    /// The transition table refused the trigger.
    Rejected(DomainError),
    /// The backend call failed; local state is unchanged.
    Failed,
}

impl TransitionOutcome {
    pub fn record(&self) -> Option<&PlayRecord> {
        match self {
            TransitionOutcome::Applied(record) => Some(record),
            _ => None,
        }
    }
}

pub struct PlaySessionMachine {
    records: Arc<dyn PlayRecordPort>,
    store: Arc<LocalStateStore>,
    thresholds: PursuitThresholds,
}

impl PlaySessionMachine {
    pub fn new(
        records: Arc<dyn PlayRecordPort>,
        store: Arc<LocalStateStore>,
        thresholds: PursuitThresholds,
    ) -> Self {
        Self {
            records,
            store,
            thresholds,
        }
    }

    pub fn thresholds(&self) -> &PursuitThresholds {
        &self.thresholds
    }

    pub fn status_of(&self, kind: PursuitKind, entity_id: &EntityId) -> Option<PlaySessionStatus> {
        self.store.status_of(kind, entity_id)
    }

    /// The geofence trigger a reading implies for an entity in `status`.
    ///
    /// Quests clear through the action engine once their last step is done,
    /// so arrival never clears a quest here.
    pub fn trigger_for(
        kind: PursuitKind,
        status: Option<PlaySessionStatus>,
        reading: &GeofenceReading,
    ) -> Option<SessionTrigger> {
        let arrived = reading.class == GeofenceClass::Arrival;
        match status {
            None => reading
                .within(Threshold::Available)
                .then_some(SessionTrigger::EnteredAvailableRadius),
            Some(PlaySessionStatus::Available) if !reading.within(Threshold::Available) => {
                Some(SessionTrigger::LeftAvailableRadius)
            }
            Some(PlaySessionStatus::Available | PlaySessionStatus::Playing)
                if arrived && kind == PursuitKind::Treasure =>
            {
                Some(SessionTrigger::ReachedFinalArrival)
            }
            Some(PlaySessionStatus::Pending) if arrived => {
                Some(SessionTrigger::ReenteredActivationRadius)
            }
            _ => None,
        }
    }

    /// Apply one trigger to an entity, calling the backend with `at`.
    pub async fn apply(
        &self,
        kind: PursuitKind,
        entity_id: &EntityId,
        trigger: SessionTrigger,
        at: Coordinates,
    ) -> TransitionOutcome {
        let current = self.status_of(kind, entity_id);
        let transition = match next_status(current, trigger) {
            Ok(transition) => transition,
            Err(e) => {
                tracing::debug!(
                    kind = %kind,
                    entity_id = %entity_id,
                    from = ?current,
                    trigger = ?trigger,
                    error = %e,
                    "Transition rejected"
                );
                return TransitionOutcome::Rejected(e);
            }
        };

        let to = match transition {
            SessionTransition::Drop => return self.drop_available(kind, entity_id).await,
            SessionTransition::To(to) if current == Some(to) => return TransitionOutcome::Unchanged,
            SessionTransition::To(to) => to,
        };

        let request = TransitionRequest::new(entity_id.clone(), at);
        match self.records.transition(kind, to, &request).await {
            Ok(record) => {
                self.store.remember_record(kind, &record);
                if record.status.is_terminal() {
                    self.finish_if_active(kind, entity_id);
                }
                tracing::info!(
                    kind = %kind,
                    entity_id = %entity_id,
                    from = ?current,
                    to = %record.status,
                    "Play status changed"
                );
                TransitionOutcome::Applied(record)
            }
            Err(e) => {
                log_backend_failure(kind, entity_id, &format!("transition to {}", to), &e);
                TransitionOutcome::Failed
            }
        }
    }

    /// Evaluate a locked sample for the active target and apply whatever it
    /// implies. The sample becomes the context's locked position.
    pub async fn on_position(
        &self,
        ctx: &mut SessionContext,
        sample: PositionSample,
    ) -> TransitionOutcome {
        let reading = ctx.evaluate(&sample);
        let status = self.status_of(ctx.kind(), ctx.entity_id());
        let Some(trigger) = Self::trigger_for(ctx.kind(), status, &reading) else {
            return TransitionOutcome::Unchanged;
        };
        ctx.lock(sample);
        let entity_id = ctx.entity_id().clone();
        self.apply(ctx.kind(), &entity_id, trigger, sample.coordinates)
            .await
    }

    /// Untracked -> AVAILABLE for an entity surfaced inside the available radius.
    pub async fn discover(
        &self,
        kind: PursuitKind,
        entity_id: &EntityId,
        at: Coordinates,
    ) -> TransitionOutcome {
        self.apply(kind, entity_id, SessionTrigger::EnteredAvailableRadius, at)
            .await
    }

    /// Explicit selection from the pursuit list; makes the context active.
    ///
    /// `position` is the player's reading at the moment of selection. It is
    /// locked into the context and sent with every call this makes. An entity
    /// the player has never been offered is first made AVAILABLE; one already
    /// PLAYING just becomes the active target again.
    pub async fn select(
        &self,
        ctx: &mut SessionContext,
        position: PositionSample,
    ) -> TransitionOutcome {
        ctx.lock(position);
        let kind = ctx.kind();
        let entity_id = ctx.entity_id().clone();
        let at = position.coordinates;

        match self.status_of(kind, &entity_id) {
            Some(PlaySessionStatus::Playing) => {
                self.store.save_active_target(ctx.target());
                return TransitionOutcome::Unchanged;
            }
            None => {
                if let outcome @ (TransitionOutcome::Failed | TransitionOutcome::Rejected(_)) =
                    self.discover(kind, &entity_id, at).await
                {
                    return outcome;
                }
            }
            Some(_) => {}
        }

        let outcome = self.apply(kind, &entity_id, SessionTrigger::Selected, at).await;
        if matches!(outcome, TransitionOutcome::Applied(_)) {
            self.store.save_active_target(ctx.target());
        }
        outcome
    }

    /// PLAYING -> PENDING when the active pursuit is put aside while still
    /// trackable but not at the goal.
    pub async fn background(
        &self,
        ctx: &SessionContext,
        position: &PositionSample,
    ) -> TransitionOutcome {
        let reading = ctx.evaluate(position);
        if reading.class != GeofenceClass::Trackable {
            tracing::debug!(
                entity_id = %ctx.entity_id(),
                class = ?reading.class,
                "Not backgrounding outside the trackable band"
            );
            return TransitionOutcome::Unchanged;
        }
        self.apply(
            ctx.kind(),
            ctx.entity_id(),
            SessionTrigger::Backgrounded,
            position.coordinates,
        )
        .await
    }

    /// Final arrival with the last action done: PLAYING -> CLEARED.
    ///
    /// Sent with the context's locked coordinates; without a lock nothing is
    /// sent and the outcome is `Failed`.
    pub async fn clear(&self, ctx: &SessionContext) -> TransitionOutcome {
        let Some(at) = ctx.call_coordinates() else {
            tracing::warn!(entity_id = %ctx.entity_id(), "No locked position to clear with");
            return TransitionOutcome::Failed;
        };
        self.apply(ctx.kind(), ctx.entity_id(), SessionTrigger::ReachedFinalArrival, at)
            .await
    }

    /// Fetch the player's records in `status` and merge them into the local
    /// indexes. For AVAILABLE, cached entries the backend no longer lists are
    /// forgotten.
    pub async fn refresh(
        &self,
        kind: PursuitKind,
        status: PlaySessionStatus,
    ) -> Result<Vec<PlayRecord>, BackendError> {
        let records = self.records.list(kind, status).await.map_err(|e| {
            tracing::warn!(kind = %kind, status = %status, error = %e, "Listing play records failed");
            e
        })?;

        for record in &records {
            self.store.remember_record(kind, record);
        }
        if status == PlaySessionStatus::Available {
            let stale = self
                .store
                .running_index(kind)
                .with_status(PlaySessionStatus::Available)
                .into_iter()
                .filter(|id| !records.iter().any(|r| &r.entity_id == id));
            for entity_id in stale {
                tracing::debug!(kind = %kind, entity_id = %entity_id, "No longer available");
                self.store.forget(kind, &entity_id);
            }
        }
        Ok(records)
    }

    /// Drop every cached AVAILABLE entry the player has moved away from.
    pub async fn sweep_available(
        &self,
        kind: PursuitKind,
        position: &PositionSample,
    ) -> Vec<EntityId> {
        let thresholds = self.thresholds.for_kind(kind);
        let mut dropped = Vec::new();
        for (entity_id, known) in self.store.known_records(kind) {
            if known.status != PlaySessionStatus::Available {
                continue;
            }
            let reading = geoquest_domain::GeofenceEvaluator::evaluate(
                &position.coordinates,
                &known.goal,
                &thresholds,
            );
            if reading.within(Threshold::Available) {
                continue;
            }
            self.drop_available(kind, &entity_id).await;
            dropped.push(entity_id);
        }
        dropped
    }

    /// Player gives up the pursuit. Cleared pursuits cannot be abandoned.
    pub fn abandon(&self, ctx: &SessionContext) -> TransitionOutcome {
        let kind = ctx.kind();
        if self.status_of(kind, ctx.entity_id()) == Some(PlaySessionStatus::Cleared) {
            return TransitionOutcome::Rejected(DomainError::invalid_state_transition(
                "cleared pursuits cannot be abandoned",
            ));
        }
        self.store.forget(kind, ctx.entity_id());
        self.store.clear_session();
        tracing::info!(kind = %kind, entity_id = %ctx.entity_id(), "Pursuit abandoned");
        TransitionOutcome::Dropped
    }

    async fn drop_available(&self, kind: PursuitKind, entity_id: &EntityId) -> TransitionOutcome {
        let known = self.store.known_record(kind, entity_id);
        self.store.forget(kind, entity_id);

        if kind == PursuitKind::Treasure {
            match known {
                Some(known) => {
                    if let Err(e) = self.records.delete_available(kind, &known.record_id).await {
                        log_backend_failure(kind, entity_id, "delete available", &e);
                    }
                }
                None => tracing::debug!(
                    entity_id = %entity_id,
                    "No record id cached; skipping backend delete"
                ),
            }
        }
        tracing::info!(kind = %kind, entity_id = %entity_id, "Dropped out-of-range pursuit");
        TransitionOutcome::Dropped
    }

    fn finish_if_active(&self, kind: PursuitKind, entity_id: &EntityId) {
        let active = self.store.active_target();
        if active.map_or(false, |t| t.kind == kind && &t.entity_id == entity_id) {
            self.store.clear_session();
        }
    }
}

fn log_backend_failure(kind: PursuitKind, entity_id: &EntityId, call: &str, error: &BackendError) {
    let not_found = matches!(error, BackendError::NotFound);
    tracing::warn!(
        kind = %kind,
        entity_id = %entity_id,
        call,
        not_found,
        error = %error,
        "Backend call failed; state left unchanged"
    );
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use geoquest_domain::{PlayRecordId, PlayTarget, Reward, ThresholdSet};
    use mockall::predicate::*;

    use super::*;
    use crate::application::testing::{memory_store, record, target};
    use crate::ports::outbound::MockPlayRecordPort;

    fn machine(records: MockPlayRecordPort, store: Arc<LocalStateStore>) -> PlaySessionMachine {
        PlaySessionMachine::new(Arc::new(records), store, PursuitThresholds::default())
    }

    fn sample(coordinates: Coordinates) -> PositionSample {
        PositionSample::new(coordinates, Some(2.0), Utc::now())
    }

    fn reading(distance_m: f64, set: ThresholdSet) -> GeofenceReading {
        // 1 degree of latitude is ~111 km.
        let goal = Coordinates::new(0.0, 0.0).unwrap();
        let at = Coordinates::new(distance_m / 111_195.0, 0.0).unwrap();
        geoquest_domain::GeofenceEvaluator::evaluate(&at, &goal, &set)
    }

    #[test]
    fn triggers_follow_thresholds() {
        let treasure = PursuitKind::Treasure;
        let quest = PursuitKind::Quest;

        assert_eq!(
            PlaySessionMachine::trigger_for(treasure, None, &reading(900.0, ThresholdSet::TREASURE)),
            Some(SessionTrigger::EnteredAvailableRadius)
        );
        assert_eq!(
            PlaySessionMachine::trigger_for(treasure, None, &reading(1_200.0, ThresholdSet::TREASURE)),
            None
        );
        assert_eq!(
            PlaySessionMachine::trigger_for(
                treasure,
                Some(PlaySessionStatus::Available),
                &reading(1_200.0, ThresholdSet::TREASURE)
            ),
            Some(SessionTrigger::LeftAvailableRadius)
        );
        assert_eq!(
            PlaySessionMachine::trigger_for(
                treasure,
                Some(PlaySessionStatus::Playing),
                &reading(1.0, ThresholdSet::TREASURE)
            ),
            Some(SessionTrigger::ReachedFinalArrival)
        );
        assert_eq!(
            PlaySessionMachine::trigger_for(
                quest,
                Some(PlaySessionStatus::Playing),
                &reading(1.0, ThresholdSet::QUEST)
            ),
            None
        );
        assert_eq!(
            PlaySessionMachine::trigger_for(
                quest,
                Some(PlaySessionStatus::Pending),
                &reading(10.0, ThresholdSet::QUEST)
            ),
            Some(SessionTrigger::ReenteredActivationRadius)
        );
        assert_eq!(
            PlaySessionMachine::trigger_for(
                quest,
                Some(PlaySessionStatus::Cleared),
                &reading(0.0, ThresholdSet::QUEST)
            ),
            None
        );
    }

    #[tokio::test]
    async fn discovery_writes_through_before_returning() {
        let store = memory_store();
        let mut records = MockPlayRecordPort::new();
        records
            .expect_transition()
            .with(eq(PursuitKind::Treasure), eq(PlaySessionStatus::Available), always())
            .times(1)
            .returning(|_, _, req| Ok(record(req.entity_id.as_str(), PlaySessionStatus::Available)));

        let machine = machine(records, store.clone());
        let entity = EntityId::from("t-1");
        let outcome = machine
            .discover(PursuitKind::Treasure, &entity, Coordinates::new(1.0, 1.0).unwrap())
            .await;

        assert!(matches!(outcome, TransitionOutcome::Applied(_)));
        assert_eq!(
            store.status_of(PursuitKind::Treasure, &entity),
            Some(PlaySessionStatus::Available)
        );
        assert_eq!(
            store.known_record(PursuitKind::Treasure, &entity).unwrap().record_id,
            PlayRecordId::from("rec-t-1")
        );
    }

    #[tokio::test]
    async fn rediscovering_an_available_entity_is_rejected_locally() {
        let store = memory_store();
        store.record_status(PursuitKind::Quest, &EntityId::from("q"), PlaySessionStatus::Available);
        let records = MockPlayRecordPort::new();

        let machine = machine(records, store);
        let outcome = machine
            .discover(PursuitKind::Quest, &EntityId::from("q"), Coordinates::new(0.0, 0.0).unwrap())
            .await;
        // Available + EnteredAvailableRadius is not in the table.
        assert!(matches!(outcome, TransitionOutcome::Rejected(_)));
    }

    #[tokio::test]
    async fn backend_failure_leaves_state_unchanged() {
        let store = memory_store();
        store.record_status(PursuitKind::Quest, &EntityId::from("q"), PlaySessionStatus::Pending);
        let mut records = MockPlayRecordPort::new();
        records
            .expect_transition()
            .times(1)
            .returning(|_, _, _| Err(BackendError::Network("offline".into())));

        let machine = machine(records, store.clone());
        let outcome = machine
            .apply(
                PursuitKind::Quest,
                &EntityId::from("q"),
                SessionTrigger::ReenteredActivationRadius,
                Coordinates::new(0.0, 0.0).unwrap(),
            )
            .await;

        assert_eq!(outcome, TransitionOutcome::Failed);
        assert_eq!(
            store.status_of(PursuitKind::Quest, &EntityId::from("q")),
            Some(PlaySessionStatus::Pending)
        );
    }

    #[tokio::test]
    async fn cleared_is_terminal() {
        let store = memory_store();
        store.record_status(PursuitKind::Treasure, &EntityId::from("t"), PlaySessionStatus::Cleared);
        let machine = machine(MockPlayRecordPort::new(), store);

        for trigger in [
            SessionTrigger::Selected,
            SessionTrigger::ReenteredActivationRadius,
            SessionTrigger::Backgrounded,
            SessionTrigger::ReachedFinalArrival,
            SessionTrigger::LeftAvailableRadius,
        ] {
            let outcome = machine
                .apply(
                    PursuitKind::Treasure,
                    &EntityId::from("t"),
                    trigger,
                    Coordinates::new(0.0, 0.0).unwrap(),
                )
                .await;
            assert!(matches!(outcome, TransitionOutcome::Rejected(_)), "{:?}", trigger);
        }
    }

    #[tokio::test]
    async fn treasure_arrival_clears_with_locked_coordinates_and_reward() {
        let store = memory_store();
        let target = target(PursuitKind::Treasure, "t-2");
        store.save_active_target(&target);
        store.record_status(PursuitKind::Treasure, &target.entity_id, PlaySessionStatus::Playing);

        let arrival = Coordinates::new(target.goal.latitude + 0.000_005, target.goal.longitude).unwrap();
        let mut records = MockPlayRecordPort::new();
        records
            .expect_transition()
            .withf(move |kind, to, req| {
                *kind == PursuitKind::Treasure
                    && *to == PlaySessionStatus::Cleared
                    && req.latitude == arrival.latitude
            })
            .times(1)
            .returning(|_, _, req| {
                let mut cleared = record(req.entity_id.as_str(), PlaySessionStatus::Cleared);
                cleared.reward = Some(Reward {
                    experience: 120,
                    coin: 30,
                    card_count: 1,
                    card_tier: Some("RARE".into()),
                });
                Ok(cleared)
            });

        let machine = machine(records, store.clone());
        let mut ctx = SessionContext::new(target, ThresholdSet::TREASURE);
        let outcome = machine.on_position(&mut ctx, sample(arrival)).await;

        let record = outcome.record().unwrap();
        assert_eq!(record.reward.as_ref().unwrap().coin, 30);
        assert_eq!(ctx.locked_position().unwrap().coordinates, arrival);
        assert!(store.active_target().is_none());
    }

    #[tokio::test]
    async fn leaving_available_radius_deletes_treasure_record() {
        let store = memory_store();
        store.remember_record(PursuitKind::Treasure, &record("t-3", PlaySessionStatus::Available));

        let mut records = MockPlayRecordPort::new();
        records
            .expect_delete_available()
            .with(eq(PursuitKind::Treasure), eq(PlayRecordId::from("rec-t-3")))
            .times(1)
            .returning(|_, _| Ok(()));

        let machine = machine(records, store.clone());
        let far = Coordinates::new(36.0, 129.0).unwrap();
        let dropped = machine.sweep_available(PursuitKind::Treasure, &sample(far)).await;

        assert_eq!(dropped, vec![EntityId::from("t-3")]);
        assert_eq!(store.status_of(PursuitKind::Treasure, &EntityId::from("t-3")), None);
    }

    #[tokio::test]
    async fn quest_drop_is_local_only() {
        let store = memory_store();
        store.remember_record(PursuitKind::Quest, &record("q-3", PlaySessionStatus::Available));
        let machine = machine(MockPlayRecordPort::new(), store.clone());

        let far = Coordinates::new(36.0, 129.0).unwrap();
        let dropped = machine.sweep_available(PursuitKind::Quest, &sample(far)).await;

        assert_eq!(dropped.len(), 1);
        assert!(store.known_records(PursuitKind::Quest).is_empty());
    }

    #[tokio::test]
    async fn select_surfaces_then_plays_from_the_players_position() {
        let store = memory_store();
        let player = Coordinates::new(38.0, 127.5).unwrap();
        let sent_from_player = move |req: &TransitionRequest| {
            req.latitude == player.latitude && req.longitude == player.longitude
        };

        let mut records = MockPlayRecordPort::new();
        let mut seq = mockall::Sequence::new();
        records
            .expect_transition()
            .withf(move |kind, to, req| {
                *kind == PursuitKind::Quest
                    && *to == PlaySessionStatus::Available
                    && sent_from_player(req)
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, req| Ok(record(req.entity_id.as_str(), PlaySessionStatus::Available)));
        records
            .expect_transition()
            .withf(move |kind, to, req| {
                *kind == PursuitKind::Quest
                    && *to == PlaySessionStatus::Playing
                    && sent_from_player(req)
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, req| Ok(record(req.entity_id.as_str(), PlaySessionStatus::Playing)));

        let machine = machine(records, store.clone());
        let mut ctx = SessionContext::new(target(PursuitKind::Quest, "q-4"), ThresholdSet::QUEST);
        assert_ne!(ctx.target().goal, player);
        let outcome = machine.select(&mut ctx, sample(player)).await;

        assert!(matches!(outcome, TransitionOutcome::Applied(_)));
        assert_eq!(ctx.call_coordinates(), Some(player));
        assert_eq!(store.active_target(), Some(ctx.target().clone()));
    }

    #[tokio::test]
    async fn selecting_a_playing_pursuit_makes_no_call() {
        let store = memory_store();
        let mut ctx = SessionContext::new(target(PursuitKind::Quest, "q-7"), ThresholdSet::QUEST);
        store.record_status(PursuitKind::Quest, ctx.entity_id(), PlaySessionStatus::Playing);

        let machine = machine(MockPlayRecordPort::new(), store.clone());
        let here = sample(Coordinates::new(37.0, 127.0).unwrap());
        assert_eq!(machine.select(&mut ctx, here).await, TransitionOutcome::Unchanged);
        assert_eq!(store.active_target(), Some(ctx.target().clone()));
    }

    #[tokio::test]
    async fn clear_without_a_locked_position_sends_nothing() {
        let store = memory_store();
        let ctx = SessionContext::new(target(PursuitKind::Quest, "q-8"), ThresholdSet::QUEST);
        store.record_status(PursuitKind::Quest, ctx.entity_id(), PlaySessionStatus::Playing);

        let machine = machine(MockPlayRecordPort::new(), store.clone());
        assert_eq!(machine.clear(&ctx).await, TransitionOutcome::Failed);
        assert_eq!(
            store.status_of(PursuitKind::Quest, ctx.entity_id()),
            Some(PlaySessionStatus::Playing)
        );
    }

    #[tokio::test]
    async fn background_only_inside_trackable_band() {
        let store = memory_store();
        let target: PlayTarget = target(PursuitKind::Quest, "q-5");
        store.record_status(PursuitKind::Quest, &target.entity_id, PlaySessionStatus::Playing);

        let mut records = MockPlayRecordPort::new();
        records
            .expect_transition()
            .with(eq(PursuitKind::Quest), eq(PlaySessionStatus::Pending), always())
            .times(1)
            .returning(|_, _, req| Ok(record(req.entity_id.as_str(), PlaySessionStatus::Pending)));

        let machine = machine(records, store.clone());
        let ctx = SessionContext::new(target.clone(), ThresholdSet::QUEST);

        let at_goal = machine.background(&ctx, &sample(target.goal)).await;
        assert_eq!(at_goal, TransitionOutcome::Unchanged);

        let two_km = Coordinates::new(target.goal.latitude + 0.018, target.goal.longitude).unwrap();
        let outcome = machine.background(&ctx, &sample(two_km)).await;
        assert!(matches!(outcome, TransitionOutcome::Applied(_)));
        assert_eq!(
            store.status_of(PursuitKind::Quest, &target.entity_id),
            Some(PlaySessionStatus::Pending)
        );
    }

    #[tokio::test]
    async fn refresh_joins_available_list() {
        let store = memory_store();
        store.remember_record(PursuitKind::Treasure, &record("old", PlaySessionStatus::Available));

        let mut records = MockPlayRecordPort::new();
        records
            .expect_list()
            .with(eq(PursuitKind::Treasure), eq(PlaySessionStatus::Available))
            .times(1)
            .returning(|_, _| Ok(vec![record("new", PlaySessionStatus::Available)]));

        let machine = machine(records, store.clone());
        let listed = machine
            .refresh(PursuitKind::Treasure, PlaySessionStatus::Available)
            .await
            .unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(store.status_of(PursuitKind::Treasure, &EntityId::from("old")), None);
        assert_eq!(
            store.status_of(PursuitKind::Treasure, &EntityId::from("new")),
            Some(PlaySessionStatus::Available)
        );
    }

    #[tokio::test]
    async fn abandon_clears_session_but_not_cleared_pursuits() {
        let store = memory_store();
        let target = target(PursuitKind::Quest, "q-6");
        store.save_active_target(&target);
        store.record_status(PursuitKind::Quest, &target.entity_id, PlaySessionStatus::Playing);
        let machine = machine(MockPlayRecordPort::new(), store.clone());
        let ctx = SessionContext::new(target.clone(), ThresholdSet::QUEST);

        assert_eq!(machine.abandon(&ctx), TransitionOutcome::Dropped);
        assert!(store.active_target().is_none());
        assert_eq!(store.status_of(PursuitKind::Quest, &target.entity_id), None);

        store.record_status(PursuitKind::Quest, &target.entity_id, PlaySessionStatus::Cleared);
        assert!(matches!(machine.abandon(&ctx), TransitionOutcome::Rejected(_)));
    }
}
