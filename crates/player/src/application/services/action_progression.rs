//! Action-step progression for a PLAYING quest.
//!
//! The engine walks the current location's steps one at a time. The backend's
//! "current action" call advances an implicit cursor, so it is issued only at
//! two points: entering/resuming play, and after a non-final step completed.
//! A busy flag makes duplicate advance triggers no-ops.
//!
//! Wait and walk steps own background tasks (a one-second ticker, a pedometer
//! over the motion stream). They are started on step entry and aborted on
//! step exit. The tasks only send [`StepSignal`]s tagged with the step's
//! epoch; the foreground loop feeds them back through
//! [`ActionProgressionEngine::handle_signal`], and signals from a step that
//! has already been left are dropped.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use geoquest_domain::{
    ActionPayload, ActionStep, Countdown, CountdownTick, MotionSample, PlaySessionStatus,
    ResumePointer, Reward, SessionHandle, StepDetector,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::hint_ladder::HintLadder;
use super::local_state_store::LocalStateStore;
use super::play_session_machine::{PlaySessionMachine, TransitionOutcome};
use super::session::SessionContext;
use crate::application::dto::{Answer, AnswerSubmission};
use crate::ports::outbound::{MotionPort, QuestCursorPort, SampleStream};

/// Message from a step's background task to the foreground loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepSignal {
    /// One second of a wait step elapsed.
    Tick { epoch: u64 },
    /// The pedometer counted another step; `steps` is the running total.
    Walked { epoch: u64, steps: u32 },
}

impl StepSignal {
    pub fn epoch(&self) -> u64 {
        match self {
            StepSignal::Tick { epoch } | StepSignal::Walked { epoch, .. } => *epoch,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepProgress {
    AwaitingAck,
    Counting(Countdown),
    Walking { taken: u32, goal: u32 },
    AwaitingAnswer { wrong_answers: u32 },
    /// Done; waiting for the boundary calls (next step or location) to succeed.
    Completed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveStep {
    pub step: ActionStep,
    pub progress: StepProgress,
    epoch: u64,
}

impl ActiveStep {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressState {
    Idle,
    FetchingNext,
    InStep(ActiveStep),
    Suspended(ResumePointer),
    SessionComplete(Option<Reward>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Entered(ActionStep),
    Progress(StepProgress),
    /// Location finished but not the pursuit; the context now targets the
    /// next location.
    Suspended(ResumePointer),
    SessionComplete(Option<Reward>),
    Ignored,
    /// No session handle: send the player back to the pursuit list.
    ReturnToList,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnswerOutcome {
    Accepted(StepOutcome),
    Wrong,
    Ignored,
    Failed,
}

#[derive(Default)]
struct StepResources {
    ticker: Option<JoinHandle<()>>,
    pedometer: Option<JoinHandle<()>>,
}

impl StepResources {
    fn release(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
        if let Some(handle) = self.pedometer.take() {
            handle.abort();
        }
    }
}

impl Drop for StepResources {
    fn drop(&mut self) {
        self.release();
    }
}

struct Inner {
    state: ProgressState,
    resources: StepResources,
}

struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

enum Advance {
    FetchCurrent,
    Boundary(ActionStep),
}

enum Begun {
    Waiting(ActionStep),
    AlreadyDone(ActionStep),
}

pub struct ActionProgressionEngine {
    cursor: Arc<dyn QuestCursorPort>,
    machine: Arc<PlaySessionMachine>,
    store: Arc<LocalStateStore>,
    motion: Arc<dyn MotionPort>,
    hints: Arc<HintLadder>,
    signals: mpsc::UnboundedSender<StepSignal>,
    inner: Mutex<Inner>,
    busy: AtomicBool,
    next_epoch: AtomicU64,
}

impl ActionProgressionEngine {
    /// Build the engine and the receiver the foreground loop drains.
    pub fn new(
        cursor: Arc<dyn QuestCursorPort>,
        machine: Arc<PlaySessionMachine>,
        store: Arc<LocalStateStore>,
        motion: Arc<dyn MotionPort>,
        hints: Arc<HintLadder>,
    ) -> (Self, mpsc::UnboundedReceiver<StepSignal>) {
        let (signals, receiver) = mpsc::unbounded_channel();
        let engine = Self {
            cursor,
            machine,
            store,
            motion,
            hints,
            signals,
            inner: Mutex::new(Inner {
                state: ProgressState::Idle,
                resources: StepResources::default(),
            }),
            busy: AtomicBool::new(false),
            next_epoch: AtomicU64::new(0),
        };
        (engine, receiver)
    }

    pub fn state(&self) -> ProgressState {
        self.lock().state.clone()
    }

    pub fn hints(&self) -> &Arc<HintLadder> {
        &self.hints
    }

    /// Start play at the context's location by asking the backend which step
    /// the player is on.
    pub async fn enter(&self, ctx: &mut SessionContext) -> StepOutcome {
        let Some(handle) = self.handle_for(ctx) else {
            return StepOutcome::ReturnToList;
        };
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            tracing::debug!("Enter ignored while an advance is in flight");
            return StepOutcome::Ignored;
        };
        self.exit_step(ProgressState::FetchingNext);
        self.run(ctx, &handle, Advance::FetchCurrent).await
    }

    /// Re-entry after a relaunch or notification. Never replays a cached
    /// step: the backend cursor decides where the player is.
    pub async fn resume(&self, ctx: &mut SessionContext) -> StepOutcome {
        tracing::info!(entity_id = %ctx.entity_id(), "Resuming quest from backend cursor");
        self.enter(ctx).await
    }

    /// TALK completion.
    pub async fn acknowledge(&self, ctx: &mut SessionContext) -> StepOutcome {
        let Some(handle) = self.handle_for(ctx) else {
            return StepOutcome::ReturnToList;
        };
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            return StepOutcome::Ignored;
        };
        let step = {
            let mut guard = self.lock();
            let inner = &mut *guard;
            match &mut inner.state {
                ProgressState::InStep(active) if active.progress == StepProgress::AwaitingAck => {
                    Self::complete(active, &mut inner.resources)
                }
                _ => return StepOutcome::Ignored,
            }
        };
        self.hints.detach();
        self.run(ctx, &handle, Advance::Boundary(step)).await
    }

    /// Submit an answer for the current puzzle step.
    pub async fn submit_answer(&self, ctx: &mut SessionContext, answer: Answer) -> AnswerOutcome {
        let Some(handle) = self.handle_for(ctx) else {
            return AnswerOutcome::Ignored;
        };
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            return AnswerOutcome::Ignored;
        };

        let (epoch, action_point_id) = {
            let guard = self.lock();
            match &guard.state {
                ProgressState::InStep(ActiveStep {
                    step,
                    progress: StepProgress::AwaitingAnswer { .. },
                    epoch,
                }) => match step.payload() {
                    ActionPayload::Puzzle { kind, .. } if *kind == answer.puzzle_kind() => {
                        (*epoch, step.action_point_id().clone())
                    }
                    _ => {
                        tracing::debug!(
                            expected = %step.action_type(),
                            "Answer does not match the puzzle kind"
                        );
                        return AnswerOutcome::Ignored;
                    }
                },
                _ => return AnswerOutcome::Ignored,
            }
        };

        let submission = AnswerSubmission {
            action_point_id,
            answer,
        };
        let verdict = match self.cursor.check_answer(&handle, &submission).await {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::warn!(
                    action_point_id = %submission.action_point_id,
                    error = %e,
                    "Answer check failed"
                );
                return AnswerOutcome::Failed;
            }
        };

        let step = {
            let mut guard = self.lock();
            let inner = &mut *guard;
            let ProgressState::InStep(active) = &mut inner.state else {
                return AnswerOutcome::Ignored;
            };
            if active.epoch != epoch {
                return AnswerOutcome::Ignored;
            }
            if !verdict.answered {
                if let StepProgress::AwaitingAnswer { wrong_answers } = &mut active.progress {
                    *wrong_answers += 1;
                }
                tracing::info!(
                    action_point_id = %submission.action_point_id,
                    "Wrong answer"
                );
                return AnswerOutcome::Wrong;
            }
            Self::complete(active, &mut inner.resources)
        };
        self.hints.detach();
        AnswerOutcome::Accepted(self.run(ctx, &handle, Advance::Boundary(step)).await)
    }

    /// Apply a ticker or pedometer signal. Signals for a step that is no
    /// longer current, or that arrive while an advance is in flight, are
    /// dropped and leave the step as it was.
    pub async fn handle_signal(&self, ctx: &mut SessionContext, signal: StepSignal) -> StepOutcome {
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            tracing::trace!(epoch = signal.epoch(), "Dropping step signal; an advance is in flight");
            return StepOutcome::Ignored;
        };
        let step = {
            let mut guard = self.lock();
            let inner = &mut *guard;
            let ProgressState::InStep(active) = &mut inner.state else {
                return StepOutcome::Ignored;
            };
            if active.epoch != signal.epoch() {
                tracing::trace!(epoch = signal.epoch(), "Dropping stale step signal");
                return StepOutcome::Ignored;
            }
            let done = match (signal, &mut active.progress) {
                (StepSignal::Tick { .. }, StepProgress::Counting(countdown)) => {
                    match countdown.tick() {
                        CountdownTick::Running { .. } => false,
                        CountdownTick::Finished => true,
                        CountdownTick::AlreadyFinished => return StepOutcome::Ignored,
                    }
                }
                (StepSignal::Walked { steps, .. }, StepProgress::Walking { taken, goal }) => {
                    *taken = steps.min(*goal);
                    steps >= *goal
                }
                _ => return StepOutcome::Ignored,
            };
            if !done {
                return StepOutcome::Progress(active.progress.clone());
            }
            tracing::debug!(
                action_point_id = %active.step.action_point_id(),
                "Step completed locally"
            );
            Self::complete(active, &mut inner.resources)
        };

        let Some(handle) = self.handle_for(ctx) else {
            return StepOutcome::ReturnToList;
        };
        self.run(ctx, &handle, Advance::Boundary(step)).await
    }

    /// Re-run whatever failed last: the cursor fetch or the boundary calls.
    pub async fn retry(&self, ctx: &mut SessionContext) -> StepOutcome {
        let Some(handle) = self.handle_for(ctx) else {
            return StepOutcome::ReturnToList;
        };
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            return StepOutcome::Ignored;
        };
        let advance = match &self.lock().state {
            ProgressState::Idle | ProgressState::FetchingNext => Advance::FetchCurrent,
            ProgressState::InStep(ActiveStep {
                step,
                progress: StepProgress::Completed,
                ..
            }) => Advance::Boundary(step.clone()),
            _ => return StepOutcome::Ignored,
        };
        self.run(ctx, &handle, advance).await
    }

    /// Leave the play screen. Mid-location progress is dropped; the backend
    /// cursor brings the player back to the same step next time.
    pub fn leave(&self) {
        let mut guard = self.lock();
        guard.resources.release();
        if matches!(
            guard.state,
            ProgressState::InStep(_) | ProgressState::FetchingNext
        ) {
            guard.state = ProgressState::Idle;
        }
        drop(guard);
        self.hints.detach();
        tracing::debug!("Left play screen");
    }

    fn handle_for(&self, ctx: &SessionContext) -> Option<SessionHandle> {
        let handle = ctx.session_handle().cloned();
        if handle.is_none() {
            tracing::warn!(entity_id = %ctx.entity_id(), "No session handle for quest play");
        }
        handle
    }

    async fn run(
        &self,
        ctx: &mut SessionContext,
        handle: &SessionHandle,
        start: Advance,
    ) -> StepOutcome {
        let mut next = start;
        loop {
            next = match next {
                Advance::FetchCurrent => {
                    let detail = match self.cursor.current_action(handle).await {
                        Ok(detail) => detail,
                        Err(e) => {
                            tracing::warn!(
                                session = %handle,
                                error = %e,
                                "Fetching current action failed"
                            );
                            return StepOutcome::Failed;
                        }
                    };
                    let step = match ActionStep::try_from(detail) {
                        Ok(step) => step,
                        Err(e) => {
                            tracing::warn!(session = %handle, error = %e, "Malformed action detail");
                            return StepOutcome::Failed;
                        }
                    };
                    match self.begin_step(step) {
                        Begun::Waiting(step) => return StepOutcome::Entered(step),
                        Begun::AlreadyDone(step) => Advance::Boundary(step),
                    }
                }
                Advance::Boundary(step) if !step.end_of_action() => {
                    self.exit_step(ProgressState::FetchingNext);
                    Advance::FetchCurrent
                }
                Advance::Boundary(_) => return self.finish_location(ctx, handle).await,
            };
        }
    }

    fn begin_step(&self, step: ActionStep) -> Begun {
        let epoch = self.next_epoch.fetch_add(1, Ordering::Relaxed) + 1;
        let mut resources = StepResources::default();

        let progress = match step.payload() {
            ActionPayload::Talk { .. } => StepProgress::AwaitingAck,
            ActionPayload::Stay { duration } => {
                let countdown = Countdown::new(*duration);
                if countdown.is_finished() {
                    StepProgress::Completed
                } else {
                    resources.ticker = Some(self.spawn_ticker(epoch));
                    StepProgress::Counting(countdown)
                }
            }
            ActionPayload::Walk { step_goal: 0 } => StepProgress::Completed,
            ActionPayload::Walk { step_goal } => {
                match self.motion.subscribe() {
                    Ok(stream) => resources.pedometer = Some(self.spawn_pedometer(epoch, stream)),
                    Err(e) => tracing::warn!(error = %e, "Motion sensor unavailable for walk step"),
                }
                StepProgress::Walking {
                    taken: 0,
                    goal: *step_goal,
                }
            }
            ActionPayload::Puzzle { .. } => StepProgress::AwaitingAnswer { wrong_answers: 0 },
        };

        match step.hint_set() {
            Some(set) => self.hints.attach(set),
            None => self.hints.detach(),
        }

        tracing::info!(
            action_point_id = %step.action_point_id(),
            sequence = step.sequence(),
            action_type = %step.action_type(),
            end_of_action = step.end_of_action(),
            "Entered action step"
        );

        let done = progress == StepProgress::Completed;
        let mut guard = self.lock();
        guard.resources.release();
        guard.resources = resources;
        guard.state = ProgressState::InStep(ActiveStep {
            step: step.clone(),
            progress,
            epoch,
        });
        if done {
            Begun::AlreadyDone(step)
        } else {
            Begun::Waiting(step)
        }
    }

    async fn finish_location(&self, ctx: &mut SessionContext, handle: &SessionHandle) -> StepOutcome {
        let location = match self.cursor.current_location(handle).await {
            Ok(location) => location,
            Err(e) => {
                tracing::warn!(session = %handle, error = %e, "Fetching current location failed");
                return StepOutcome::Failed;
            }
        };

        if location.end_location {
            return self.complete_session(ctx).await;
        }

        let next = match self.cursor.next_location(handle).await {
            Ok(next) => next,
            Err(e) => {
                tracing::warn!(session = %handle, error = %e, "Fetching next location failed");
                return StepOutcome::Failed;
            }
        };
        let pointer = ResumePointer {
            session_handle: handle.clone(),
            entity_id: ctx.entity_id().clone(),
            title: ctx.target().title.clone(),
            next_location_name: next.name.clone(),
            next_latitude: next.coordinates.latitude,
            next_longitude: next.coordinates.longitude,
        };
        self.store.save_resume_pointer(&pointer);
        match ctx.retarget(&pointer) {
            Ok(()) => self.store.save_active_target(ctx.target()),
            Err(e) => tracing::warn!(error = %e, "Could not retarget to next location"),
        }
        self.exit_step(ProgressState::Suspended(pointer.clone()));

        tracing::info!(
            entity_id = %pointer.entity_id,
            next_location = %pointer.next_location_name,
            "Location finished; travel to the next one"
        );
        StepOutcome::Suspended(pointer)
    }

    async fn complete_session(&self, ctx: &mut SessionContext) -> StepOutcome {
        let reward = match self.machine.clear(ctx).await {
            TransitionOutcome::Applied(record) => record.reward.or_else(|| ctx.target().reward.clone()),
            TransitionOutcome::Rejected(_)
                if self.machine.status_of(ctx.kind(), ctx.entity_id())
                    == Some(PlaySessionStatus::Cleared) =>
            {
                ctx.target().reward.clone()
            }
            other => {
                tracing::warn!(
                    entity_id = %ctx.entity_id(),
                    outcome = ?other,
                    "Clearing the quest did not go through"
                );
                return StepOutcome::Failed;
            }
        };

        self.store.clear_session();
        self.exit_step(ProgressState::SessionComplete(reward.clone()));
        tracing::info!(entity_id = %ctx.entity_id(), reward = ?reward, "Quest cleared");
        StepOutcome::SessionComplete(reward)
    }

    fn complete(active: &mut ActiveStep, resources: &mut StepResources) -> ActionStep {
        active.progress = StepProgress::Completed;
        resources.release();
        active.step.clone()
    }

    fn exit_step(&self, next: ProgressState) {
        let mut guard = self.lock();
        guard.resources.release();
        guard.state = next;
        drop(guard);
        self.hints.detach();
    }

    fn spawn_ticker(&self, epoch: u64) -> JoinHandle<()> {
        let signals = self.signals.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                if signals.send(StepSignal::Tick { epoch }).is_err() {
                    break;
                }
            }
        })
    }

    fn spawn_pedometer(&self, epoch: u64, mut stream: SampleStream<MotionSample>) -> JoinHandle<()> {
        let signals = self.signals.clone();
        tokio::spawn(async move {
            let mut detector = StepDetector::default();
            while let Some(sample) = stream.next().await {
                if detector.push(sample)
                    && signals
                        .send(StepSignal::Walked {
                            epoch,
                            steps: detector.steps(),
                        })
                        .is_err()
                {
                    break;
                }
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use geoquest_domain::{
        ActionPointId, ActionType, HintSlot, PlaySessionStatus, PositionSample, PursuitKind,
        ThresholdSet,
    };
    use mockall::predicate::*;
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;
    use crate::application::dto::ActionDetail;
    use crate::application::services::session::PursuitThresholds;
    use crate::application::testing::{
        location, memory_store, target, RecordingPlayRecords, ScriptedCursor, ScriptedMotion,
    };
    use crate::application::dto::{HintPurchaseRequest, HintPurchaseResponse};
    use crate::application::services::hint_ladder::HintPurchaseOutcome;
    use crate::ports::outbound::MockHintPort;

    struct Harness {
        engine: ActionProgressionEngine,
        signals: UnboundedReceiver<StepSignal>,
        cursor: Arc<ScriptedCursor>,
        records: Arc<RecordingPlayRecords>,
        motion: Arc<ScriptedMotion>,
        store: Arc<LocalStateStore>,
        ctx: SessionContext,
    }

    fn harness(actions: Vec<ActionDetail>) -> Harness {
        harness_with_hints(actions, MockHintPort::new())
    }

    fn harness_with_hints(actions: Vec<ActionDetail>, hint_port: MockHintPort) -> Harness {
        let store = memory_store();
        let cursor = Arc::new(ScriptedCursor::new(actions));
        let records = Arc::new(RecordingPlayRecords::new());
        let motion = Arc::new(ScriptedMotion::new());
        let machine = Arc::new(PlaySessionMachine::new(
            records.clone(),
            store.clone(),
            PursuitThresholds::default(),
        ));
        let hints = Arc::new(HintLadder::new(Arc::new(hint_port)));
        let (engine, signals) = ActionProgressionEngine::new(
            cursor.clone(),
            machine,
            store.clone(),
            motion.clone(),
            hints,
        );

        let target = target(PursuitKind::Quest, "quest-1");
        store.save_active_target(&target);
        store.record_status(PursuitKind::Quest, &target.entity_id, PlaySessionStatus::Playing);
        let at_goal = PositionSample::new(target.goal, Some(3.0), Utc::now());
        let mut ctx = SessionContext::new(target, ThresholdSet::QUEST);
        ctx.lock(at_goal);

        Harness {
            engine,
            signals,
            cursor,
            records,
            motion,
            store,
            ctx,
        }
    }

    fn talk(sequence: u32) -> ActionDetail {
        let mut detail = ActionDetail::new(format!("ap-{}", sequence), sequence, ActionType::Talk);
        detail.dialogue = Some("Welcome".into());
        detail
    }

    fn stay_one_minute(sequence: u32) -> ActionDetail {
        let mut detail = ActionDetail::new(format!("ap-{}", sequence), sequence, ActionType::Stay);
        detail.day = Some(0);
        detail.hour = Some(0);
        detail.minute = Some(1);
        detail
    }

    fn walk(sequence: u32, count: u32) -> ActionDetail {
        let mut detail = ActionDetail::new(format!("ap-{}", sequence), sequence, ActionType::Walk);
        detail.walking_count = Some(count);
        detail
    }

    fn input_puzzle(sequence: u32) -> ActionDetail {
        let mut detail =
            ActionDetail::new(format!("ap-{}", sequence), sequence, ActionType::InputPuzzle);
        detail.question = Some("Year the bridge opened?".into());
        detail.hint1 = Some("Before 1950".into());
        detail
    }

    fn last(mut detail: ActionDetail) -> ActionDetail {
        detail.end_action = true;
        detail
    }

    async fn drain_until_settled(h: &mut Harness) -> StepOutcome {
        while let Some(signal) = h.signals.recv().await {
            match h.engine.handle_signal(&mut h.ctx, signal).await {
                StepOutcome::Progress(_) | StepOutcome::Ignored => continue,
                settled => return settled,
            }
        }
        StepOutcome::Failed
    }

    #[tokio::test(start_paused = true)]
    async fn stay_step_requests_next_after_sixty_seconds_exactly_once() {
        let mut h = harness(vec![stay_one_minute(1), talk(2)]);

        let entered = h.engine.enter(&mut h.ctx).await;
        assert!(matches!(entered, StepOutcome::Entered(ref s) if s.action_type() == ActionType::Stay));
        assert_eq!(h.cursor.current_action_calls(), 1);

        let started = tokio::time::Instant::now();
        let settled = drain_until_settled(&mut h).await;

        assert!(matches!(settled, StepOutcome::Entered(ref s) if s.action_type() == ActionType::Talk));
        assert_eq!(started.elapsed(), Duration::from_secs(60));
        assert_eq!(h.cursor.current_action_calls(), 2);

        // No ticks leak into the talk step.
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(h.signals.try_recv().is_err());
        assert_eq!(h.cursor.current_action_calls(), 2);
    }

    #[tokio::test]
    async fn walk_step_completes_after_fifty_steps() {
        let mut h = harness(vec![walk(1, 50), talk(2)]);
        h.engine.enter(&mut h.ctx).await;

        let feed = h.motion.take_feed().unwrap();
        for i in 0..50u64 {
            assert!(feed.send(MotionSample::new(12.5, i * 400)).await);
            assert!(feed.send(MotionSample::new(9.0, i * 400 + 200)).await);
        }

        let settled = drain_until_settled(&mut h).await;
        assert!(matches!(settled, StepOutcome::Entered(ref s) if s.action_type() == ActionType::Talk));
        assert_eq!(h.cursor.current_action_calls(), 2);
    }

    #[tokio::test]
    async fn step_never_advances_without_completion() {
        let mut h = harness(vec![input_puzzle(1), talk(2)]);
        h.engine.enter(&mut h.ctx).await;

        // A tap is not a puzzle answer, and a foreign signal is stale.
        assert_eq!(h.engine.acknowledge(&mut h.ctx).await, StepOutcome::Ignored);
        assert_eq!(
            h.engine
                .handle_signal(&mut h.ctx, StepSignal::Tick { epoch: 999 })
                .await,
            StepOutcome::Ignored
        );
        assert_eq!(h.cursor.current_action_calls(), 1);

        h.cursor.push_verdict(false);
        assert_eq!(
            h.engine
                .submit_answer(&mut h.ctx, Answer::Text("1972".into()))
                .await,
            AnswerOutcome::Wrong
        );
        assert_eq!(h.cursor.current_action_calls(), 1);
        assert!(matches!(
            h.engine.state(),
            ProgressState::InStep(ActiveStep {
                progress: StepProgress::AwaitingAnswer { wrong_answers: 1 },
                ..
            })
        ));

        h.cursor.push_verdict(true);
        let accepted = h
            .engine
            .submit_answer(&mut h.ctx, Answer::Text("1936".into()))
            .await;
        assert!(matches!(accepted, AnswerOutcome::Accepted(StepOutcome::Entered(_))));
        assert_eq!(h.cursor.current_action_calls(), 2);
    }

    #[tokio::test]
    async fn end_of_location_writes_resume_pointer_and_suspends() {
        let mut h = harness(vec![last(talk(1))]);
        h.cursor.set_current_location(location("loc-1", "Square", 37.0, 127.0, false));
        h.cursor.set_next_location(location("loc-2", "Harbour", 37.2, 127.3, false));

        h.engine.enter(&mut h.ctx).await;
        let outcome = h.engine.acknowledge(&mut h.ctx).await;

        let StepOutcome::Suspended(pointer) = outcome else {
            panic!("expected suspension, got {:?}", outcome);
        };
        assert_eq!(pointer.next_location_name, "Harbour");
        assert_eq!((pointer.next_latitude, pointer.next_longitude), (37.2, 127.3));
        assert_eq!(h.store.resume_pointer(), Some(pointer.clone()));
        assert_eq!(h.ctx.target().goal.latitude, 37.2);
        assert_eq!(h.store.active_target().unwrap().goal.latitude, 37.2);
        assert_eq!(h.engine.state(), ProgressState::Suspended(pointer));
        assert!(h.records.transitions().is_empty());
    }

    #[tokio::test]
    async fn final_location_clears_session_and_resume_pointer() {
        let mut h = harness(vec![last(talk(1))]);
        h.cursor.set_current_location(location("loc-9", "Summit", 37.0, 127.0, true));
        h.store.save_resume_pointer(&ResumePointer {
            session_handle: SessionHandle::from("session-quest-1"),
            entity_id: h.ctx.entity_id().clone(),
            title: "Old".into(),
            next_location_name: "Summit".into(),
            next_latitude: 37.0,
            next_longitude: 127.0,
        });

        h.engine.enter(&mut h.ctx).await;
        let outcome = h.engine.acknowledge(&mut h.ctx).await;

        assert!(matches!(outcome, StepOutcome::SessionComplete(Some(_))));
        assert_eq!(
            h.records.transitions(),
            vec![(PursuitKind::Quest, PlaySessionStatus::Cleared)]
        );
        assert!(h.store.resume_pointer().is_none());
        assert!(h.store.active_target().is_none());
        assert_eq!(h.cursor.next_location_calls(), 0);
    }

    #[tokio::test]
    async fn resume_requeries_the_cursor() {
        let mut h = harness(vec![talk(3), talk(3)]);

        h.engine.enter(&mut h.ctx).await;
        h.engine.leave();
        assert_eq!(h.engine.state(), ProgressState::Idle);

        let resumed = h.engine.resume(&mut h.ctx).await;
        assert!(matches!(resumed, StepOutcome::Entered(ref s) if s.sequence() == 3));
        assert_eq!(h.cursor.current_action_calls(), 2);
    }

    #[tokio::test]
    async fn duplicate_advance_while_busy_is_ignored() {
        let mut h = harness(vec![talk(1), talk(2)]);
        h.engine.enter(&mut h.ctx).await;

        h.cursor.hold_next_fetch();
        let engine = &h.engine;
        let mut first_ctx = h.ctx.clone();
        let mut second_ctx = h.ctx.clone();
        let (first, second) = tokio::join!(engine.acknowledge(&mut first_ctx), async {
            h.cursor.wait_until_held().await;
            let outcome = engine.acknowledge(&mut second_ctx).await;
            h.cursor.release_held();
            outcome
        });

        assert!(matches!(first, StepOutcome::Entered(_)));
        assert_eq!(second, StepOutcome::Ignored);
        assert_eq!(h.cursor.current_action_calls(), 2);
    }

    #[tokio::test]
    async fn failed_fetch_is_retried_on_demand_only() {
        let mut h = harness(vec![talk(1), talk(2)]);
        h.engine.enter(&mut h.ctx).await;

        h.cursor.fail_next_fetch();
        assert_eq!(h.engine.acknowledge(&mut h.ctx).await, StepOutcome::Failed);
        assert_eq!(h.engine.state(), ProgressState::FetchingNext);

        let retried = h.engine.retry(&mut h.ctx).await;
        assert!(matches!(retried, StepOutcome::Entered(ref s) if s.sequence() == 2));
    }

    #[tokio::test]
    async fn missing_session_handle_returns_to_list() {
        let h = harness(vec![talk(1)]);
        let mut target = h.ctx.target().clone();
        target.session_handle = None;
        let mut ctx = SessionContext::new(target, ThresholdSet::QUEST);

        assert_eq!(h.engine.enter(&mut ctx).await, StepOutcome::ReturnToList);
        assert_eq!(h.cursor.current_action_calls(), 0);
    }

    #[tokio::test]
    async fn zero_length_wait_advances_immediately() {
        let mut h = harness(vec![
            ActionDetail {
                day: Some(0),
                hour: Some(0),
                minute: Some(0),
                ..ActionDetail::new("ap-1", 1, ActionType::Stay)
            },
            talk(2),
        ]);
        let outcome = h.engine.enter(&mut h.ctx).await;
        assert!(matches!(outcome, StepOutcome::Entered(ref s) if s.sequence() == 2));
        assert_eq!(h.cursor.current_action_calls(), 2);
    }

    #[tokio::test]
    async fn puzzle_steps_attach_their_hints() {
        let mut h = harness(vec![input_puzzle(1)]);
        h.engine.enter(&mut h.ctx).await;
        assert!(h.engine.hints().can_purchase(geoquest_domain::HintSlot::FIRST));

        h.engine.leave();
        assert!(!h.engine.hints().can_purchase(geoquest_domain::HintSlot::FIRST));
    }

    #[tokio::test]
    async fn finished_wait_is_not_consumed_while_an_advance_is_in_flight() {
        let mut h = harness(vec![stay_one_minute(1), talk(2)]);
        h.engine.enter(&mut h.ctx).await;
        let epoch = match h.engine.state() {
            ProgressState::InStep(active) => active.epoch(),
            other => panic!("expected a wait step, got {:?}", other),
        };

        {
            let _in_flight = BusyGuard::acquire(&h.engine.busy).unwrap();
            for _ in 0..60 {
                let outcome = h.engine.handle_signal(&mut h.ctx, StepSignal::Tick { epoch }).await;
                assert_eq!(outcome, StepOutcome::Ignored);
            }
        }
        assert!(matches!(
            h.engine.state(),
            ProgressState::InStep(ActiveStep {
                progress: StepProgress::Counting(ref countdown),
                ..
            }) if countdown.remaining_secs() == 60
        ));

        let mut outcome = StepOutcome::Ignored;
        for _ in 0..60 {
            outcome = h.engine.handle_signal(&mut h.ctx, StepSignal::Tick { epoch }).await;
        }
        assert!(matches!(outcome, StepOutcome::Entered(ref s) if s.action_type() == ActionType::Talk));
        assert_eq!(h.cursor.current_action_calls(), 2);
    }

    #[tokio::test]
    async fn bought_hint_survives_leaving_and_resuming_the_puzzle() {
        let mut port = MockHintPort::new();
        port.expect_purchase_hint()
            .with(eq(HintPurchaseRequest {
                action_point_id: ActionPointId::from("ap-1"),
                hint_index: HintSlot::FIRST,
            }))
            .times(1)
            .returning(|_| {
                Ok(HintPurchaseResponse {
                    hint: Some("Before 1950".into()),
                    error: None,
                })
            });
        let mut h = harness_with_hints(vec![input_puzzle(1), input_puzzle(1)], port);

        h.engine.enter(&mut h.ctx).await;
        assert_eq!(
            h.engine.hints().purchase(HintSlot::FIRST).await,
            HintPurchaseOutcome::Unlocked("Before 1950".into())
        );

        h.engine.leave();
        h.engine.resume(&mut h.ctx).await;

        assert_eq!(
            h.engine.hints().purchase(HintSlot::FIRST).await,
            HintPurchaseOutcome::AlreadyUnlocked("Before 1950".into())
        );
        assert_eq!(h.cursor.current_action_calls(), 2);
    }
}
