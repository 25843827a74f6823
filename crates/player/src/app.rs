//! Application state, composition, and the foreground play loop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::OptionFuture;
use geoquest_domain::{
    ActionPayload, ActionStep, GeofenceClass, GeofenceReading, PlaySessionStatus, PlayTarget,
    PursuitKind,
};
use tokio::sync::{mpsc, watch};

use crate::application::dto::Answer;
use crate::application::services::{
    ActionProgressionEngine, AnswerOutcome, BackgroundNotifier, GeoSampler, GeofenceLock,
    HintLadder, HintPurchaseOutcome, LocalStateStore, PlaySessionMachine, ProgressState,
    PursuitThresholds, Reentry, ReentryScreen, SessionContext, StepOutcome, StepProgress,
    StepSignal, TransitionOutcome,
};
use crate::console::{image_content_type, Command, HELP};
use crate::ports::outbound::{
    GeolocationPort, HintPort, MotionPort, NotificationPort, PlayRecordPort, QuestCursorPort,
    SensorError, StorageProvider,
};

/// Every outbound adapter the app needs, injected as port traits.
pub struct Adapters {
    pub play_records: Arc<dyn PlayRecordPort>,
    pub cursor: Arc<dyn QuestCursorPort>,
    pub hints: Arc<dyn HintPort>,
    pub geolocation: Arc<dyn GeolocationPort>,
    pub motion: Arc<dyn MotionPort>,
    pub notifications: Arc<dyn NotificationPort>,
    pub storage: Arc<dyn StorageProvider>,
}

/// Everything the foreground loop listens to besides position.
pub struct Inbox {
    pub signals: mpsc::UnboundedReceiver<StepSignal>,
    pub reentries: mpsc::Receiver<Reentry>,
    pub commands: mpsc::Receiver<Command>,
}

/// Main application state.
pub struct App {
    pub store: Arc<LocalStateStore>,
    pub sampler: GeoSampler,
    pub machine: Arc<PlaySessionMachine>,
    pub engine: ActionProgressionEngine,
    pub notifier: Arc<BackgroundNotifier>,
    thresholds: PursuitThresholds,
    /// Wait before watching again after a failed transition call.
    resample_delay: Duration,
}

impl App {
    pub fn new(
        adapters: Adapters,
        thresholds: PursuitThresholds,
    ) -> (Self, mpsc::UnboundedReceiver<StepSignal>) {
        let store = Arc::new(LocalStateStore::new(adapters.storage));
        let machine = Arc::new(PlaySessionMachine::new(
            adapters.play_records,
            store.clone(),
            thresholds,
        ));
        let hints = Arc::new(HintLadder::new(adapters.hints));
        let (engine, signals) = ActionProgressionEngine::new(
            adapters.cursor,
            machine.clone(),
            store.clone(),
            adapters.motion,
            hints,
        );

        let app = Self {
            store,
            sampler: GeoSampler::new(adapters.geolocation),
            machine,
            engine,
            notifier: Arc::new(BackgroundNotifier::new(adapters.notifications)),
            thresholds,
            resample_delay: Duration::from_secs(1),
        };
        (app, signals)
    }

    pub fn with_resample_delay(mut self, delay: Duration) -> Self {
        self.resample_delay = delay;
        self
    }

    pub fn hints(&self) -> &Arc<HintLadder> {
        self.engine.hints()
    }

    pub fn context_for(&self, target: PlayTarget) -> SessionContext {
        let thresholds = self.thresholds.for_kind(target.kind);
        SessionContext::new(target, thresholds)
    }

    /// Rebuild the active context from local state after a launch. A quest
    /// with a resume pointer is aimed at its next location.
    pub fn restore(&self) -> Option<SessionContext> {
        let target = self.store.active_target()?;
        let mut ctx = self.context_for(target);

        if let Some(pointer) = self.store.resume_pointer() {
            if &pointer.entity_id == ctx.entity_id() {
                match ctx.retarget(&pointer) {
                    Ok(()) => tracing::info!(
                        entity_id = %pointer.entity_id,
                        next_location = %pointer.next_location_name,
                        "Resuming toward next location"
                    ),
                    Err(e) => tracing::warn!(error = %e, "Ignoring unusable resume pointer"),
                }
            }
        }

        tracing::info!(
            kind = %ctx.kind(),
            entity_id = %ctx.entity_id(),
            title = %ctx.target().title,
            "Restored active pursuit"
        );
        Some(ctx)
    }

    /// Make `target` the active pursuit from where the player stands now.
    /// Returns its context if the backend accepted the selection.
    pub async fn select_pursuit(&self, target: PlayTarget) -> Option<SessionContext> {
        let mut ctx = self.context_for(target);
        let position = match self.sampler.current().await {
            Ok(position) => position,
            Err(e) => {
                tracing::warn!(entity_id = %ctx.entity_id(), error = %e, "No position to select from");
                return None;
            }
        };
        let outcome = self.machine.select(&mut ctx, position).await;
        match outcome {
            TransitionOutcome::Applied(_) | TransitionOutcome::Unchanged => {
                tracing::info!(
                    kind = %ctx.kind(),
                    entity_id = %ctx.entity_id(),
                    title = %ctx.target().title,
                    "Pursuit selected"
                );
                Some(ctx)
            }
            TransitionOutcome::Rejected(e) => {
                tracing::warn!(entity_id = %ctx.entity_id(), error = %e, "Selection rejected");
                None
            }
            TransitionOutcome::Failed | TransitionOutcome::Dropped => None,
        }
    }

    /// A tapped notification brings the app forward on its pursuit. An
    /// action-screen tap on a PLAYING quest picks the step back up from the
    /// backend cursor. Returns false when the pursuit could not be selected
    /// and `ctx` is left alone.
    pub async fn handle_reentry(
        &self,
        ctx: &mut Option<SessionContext>,
        reentry: Reentry,
    ) -> bool {
        self.notifier.set_foreground(true);

        let target = match self.store.active_target() {
            Some(active) if active.kind == reentry.kind && active.entity_id == reentry.entity_id => {
                active
            }
            _ => {
                let Some(known) = self.store.known_record(reentry.kind, &reentry.entity_id) else {
                    tracing::warn!(
                        kind = %reentry.kind,
                        entity_id = %reentry.entity_id,
                        "Notification names a pursuit with no local record"
                    );
                    return false;
                };
                known.to_target(reentry.kind, &reentry.entity_id)
            }
        };

        let Some(mut next) = self.select_pursuit(target).await else {
            return false;
        };
        self.engine.leave();

        let position = next.locked_position().copied();
        if let Some(pointer) = self.store.resume_pointer() {
            if &pointer.entity_id == next.entity_id() {
                if let Err(e) = next.retarget(&pointer) {
                    tracing::warn!(error = %e, "Ignoring unusable resume pointer");
                }
            }
        }
        if let Some(position) = position {
            next.lock(position);
        }

        let resume_step = reentry.screen == ReentryScreen::Action
            && next.kind() == PursuitKind::Quest
            && self.machine.status_of(next.kind(), next.entity_id())
                == Some(PlaySessionStatus::Playing);
        *ctx = Some(next);

        if resume_step {
            if let Some(c) = ctx.as_mut() {
                let outcome = self.engine.resume(c).await;
                self.after_step(ctx, outcome);
            }
        }
        true
    }

    /// Lock a fresh reading into a context that has none, so a step boundary
    /// that clears the quest has player coordinates to send.
    async fn ensure_locked(&self, ctx: &mut SessionContext) {
        if ctx.locked_position().is_some() {
            return;
        }
        match self.sampler.current().await {
            Ok(position) => ctx.lock(position),
            Err(e) => tracing::warn!(error = %e, "No position to lock before resuming"),
        }
    }

    /// The play screen goes away: stop step work and, if the player is still
    /// trackable but not at the goal, pause the pursuit.
    pub async fn leave_play_screen(&self, ctx: Option<&SessionContext>) {
        self.engine.leave();
        let Some(ctx) = ctx else { return };
        match self.sampler.current().await {
            Ok(position) => {
                self.machine.background(ctx, &position).await;
            }
            Err(e) => tracing::warn!(error = %e, "No position while leaving play"),
        }
    }

    /// Drive play until `shutdown` flips to true.
    pub async fn run(
        &self,
        mut ctx: Option<SessionContext>,
        mut inbox: Inbox,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut watching = true;
        let mut backoff = false;

        loop {
            let lock: OptionFuture<_> = ctx
                .as_ref()
                .filter(|c| watching && self.needs_position(c))
                .map(|c| {
                    let delay = if backoff { self.resample_delay } else { Duration::ZERO };
                    self.watch_for(c, delay)
                })
                .into();

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                Some(signal) = inbox.signals.recv() => {
                    if let Some(c) = ctx.as_mut() {
                        let outcome = self.engine.handle_signal(c, signal).await;
                        self.after_step(&mut ctx, outcome);
                    }
                }
                Some(reentry) = inbox.reentries.recv() => {
                    if self.handle_reentry(&mut ctx, reentry).await {
                        watching = true;
                        backoff = false;
                    }
                }
                Some(command) = inbox.commands.recv() => {
                    self.apply_command(&mut ctx, command).await;
                    watching = true;
                    backoff = false;
                }
                Some(result) = lock => {
                    match result {
                        Ok(Some(lock)) => backoff = self.on_lock(&mut ctx, lock).await,
                        Ok(None) => watching = false,
                        Err(e) => {
                            tracing::warn!(error = %e, "Position watch unavailable");
                            watching = false;
                        }
                    }
                }
            }
        }

        self.engine.leave();
        tracing::info!("Play loop stopped");
    }

    fn needs_position(&self, ctx: &SessionContext) -> bool {
        if matches!(
            self.engine.state(),
            ProgressState::InStep(_) | ProgressState::FetchingNext
        ) {
            return false;
        }
        self.machine.status_of(ctx.kind(), ctx.entity_id()) != Some(PlaySessionStatus::Cleared)
    }

    fn watch_for(
        &self,
        ctx: &SessionContext,
        delay: Duration,
    ) -> impl Future<Output = Result<Option<GeofenceLock>, SensorError>> + '_ {
        let kind = ctx.kind();
        let status = self.machine.status_of(kind, ctx.entity_id());
        let goal = ctx.target().goal;
        let thresholds = *ctx.thresholds();
        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            self.sampler
                .lock_on(goal, thresholds, move |reading| {
                    Self::position_matters(kind, status, reading)
                })
                .await
        }
    }

    fn position_matters(
        kind: PursuitKind,
        status: Option<PlaySessionStatus>,
        reading: &GeofenceReading,
    ) -> bool {
        PlaySessionMachine::trigger_for(kind, status, reading).is_some()
            || Self::at_quest_location(kind, status, reading)
    }

    fn at_quest_location(
        kind: PursuitKind,
        status: Option<PlaySessionStatus>,
        reading: &GeofenceReading,
    ) -> bool {
        kind == PursuitKind::Quest
            && status == Some(PlaySessionStatus::Playing)
            && reading.class == GeofenceClass::Arrival
    }

    /// Act on a geofence lock. Returns true when the backend call failed and
    /// the next watch should wait a sample interval first.
    async fn on_lock(&self, ctx: &mut Option<SessionContext>, lock: GeofenceLock) -> bool {
        let Some(c) = ctx.as_mut() else {
            return false;
        };
        let status = self.machine.status_of(c.kind(), c.entity_id());

        if Self::at_quest_location(c.kind(), status, &lock.reading) {
            c.lock(lock.sample);
            let outcome = self.engine.enter(c).await;
            let failed = outcome == StepOutcome::Failed;
            self.after_step(ctx, outcome);
            return failed;
        }

        let outcome = self.machine.on_position(c, lock.sample).await;
        match outcome {
            TransitionOutcome::Applied(record) => {
                match record.status {
                    PlaySessionStatus::Cleared => {
                        tracing::info!(
                            entity_id = %record.entity_id,
                            reward = ?record.reward,
                            "Pursuit cleared"
                        );
                        self.notifier.notify_attention(
                            c.target(),
                            ReentryScreen::Play,
                            c.target().title.clone(),
                            "You found it!",
                        );
                        *ctx = None;
                    }
                    PlaySessionStatus::Playing => {
                        self.notifier.notify_attention(
                            c.target(),
                            ReentryScreen::Play,
                            c.target().title.clone(),
                            "You are back on track.",
                        );
                    }
                    PlaySessionStatus::Available => {
                        self.notifier.notify_attention(
                            c.target(),
                            ReentryScreen::Play,
                            c.target().title.clone(),
                            "A new pursuit is nearby.",
                        );
                    }
                    PlaySessionStatus::Pending => {}
                }
                false
            }
            TransitionOutcome::Dropped => {
                tracing::info!(entity_id = %c.entity_id(), "Pursuit out of range; dropped");
                *ctx = None;
                false
            }
            TransitionOutcome::Failed => true,
            TransitionOutcome::Unchanged | TransitionOutcome::Rejected(_) => false,
        }
    }

    fn after_step(&self, ctx: &mut Option<SessionContext>, outcome: StepOutcome) {
        match outcome {
            StepOutcome::Entered(step) => {
                describe_step(&step);
                if let Some(c) = ctx.as_ref() {
                    self.notifier.notify_attention(
                        c.target(),
                        ReentryScreen::Action,
                        c.target().title.clone(),
                        "Your next step is ready.",
                    );
                }
            }
            StepOutcome::Progress(StepProgress::Counting(countdown)) => {
                if countdown.remaining_secs() % 60 == 0 {
                    let (days, hours, minutes, seconds) = countdown.remaining_parts();
                    tracing::info!(days, hours, minutes, seconds, "Stay remaining");
                }
            }
            StepOutcome::Progress(StepProgress::Walking { taken, goal }) => {
                tracing::debug!(taken, goal, "Walking");
            }
            StepOutcome::Progress(_) | StepOutcome::Ignored => {}
            StepOutcome::Suspended(pointer) => {
                tracing::info!(
                    next_location = %pointer.next_location_name,
                    "Location finished; head to the next one"
                );
                if let Some(c) = ctx.as_ref() {
                    self.notifier.notify_attention(
                        c.target(),
                        ReentryScreen::Play,
                        c.target().title.clone(),
                        format!("Next stop: {}", pointer.next_location_name),
                    );
                }
            }
            StepOutcome::SessionComplete(reward) => {
                tracing::info!(reward = ?reward, "Quest complete");
                *ctx = None;
            }
            StepOutcome::ReturnToList => {
                tracing::warn!("Quest has no session; pick it again from the list");
                *ctx = None;
            }
            StepOutcome::Failed => {
                tracing::warn!("Advancing the step failed; `retry` to try again");
            }
        }
    }

    async fn submit(&self, ctx: &mut Option<SessionContext>, answer: Answer) {
        let Some(c) = ctx.as_mut() else {
            tracing::warn!("No active pursuit to answer for");
            return;
        };
        let outcome = self.engine.submit_answer(c, answer).await;
        match outcome {
            AnswerOutcome::Accepted(outcome) => {
                tracing::info!("Correct");
                self.after_step(ctx, outcome);
            }
            AnswerOutcome::Wrong => tracing::info!("Not quite; try again"),
            AnswerOutcome::Ignored => tracing::debug!("Answer ignored"),
            AnswerOutcome::Failed => tracing::warn!("Checking the answer failed; try again"),
        }
    }

    pub async fn apply_command(&self, ctx: &mut Option<SessionContext>, command: Command) {
        match command {
            Command::Select(kind, entity_id) => {
                let Some(known) = self.store.known_record(kind, &entity_id) else {
                    tracing::warn!(kind = %kind, entity_id = %entity_id, "Unknown pursuit; refresh first");
                    return;
                };
                if let Some(next) = self.select_pursuit(known.to_target(kind, &entity_id)).await {
                    self.engine.leave();
                    *ctx = Some(next);
                }
            }
            Command::Refresh(kind) => self.refresh(kind).await,
            Command::Ack => {
                if let Some(c) = ctx.as_mut() {
                    let outcome = self.engine.acknowledge(c).await;
                    self.after_step(ctx, outcome);
                }
            }
            Command::Answer(text) => self.submit(ctx, Answer::Text(text)).await,
            Command::Here => match self.sampler.current().await {
                Ok(position) => self.submit(ctx, Answer::Location(position.coordinates)).await,
                Err(e) => tracing::warn!(error = %e, "No position for the answer"),
            },
            Command::Photo(path) => match tokio::fs::read(&path).await {
                Ok(bytes) => {
                    let file_name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "photo.jpg".to_string());
                    let answer = Answer::Photo {
                        file_name,
                        content_type: image_content_type(&path).to_string(),
                        bytes,
                    };
                    self.submit(ctx, answer).await;
                }
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Reading photo failed"),
            },
            Command::Hint(slot) => match self.hints().purchase(slot).await {
                HintPurchaseOutcome::Unlocked(content)
                | HintPurchaseOutcome::AlreadyUnlocked(content) => {
                    tracing::info!(slot = slot.index(), hint = %content, "Hint");
                }
                HintPurchaseOutcome::NeedPreviousHint => {
                    tracing::info!(slot = slot.index(), "Buy the previous hint first");
                }
                HintPurchaseOutcome::InsufficientFunds(message) => {
                    tracing::info!(slot = slot.index(), message = %message, "Hint not affordable");
                }
                HintPurchaseOutcome::Unavailable => {
                    tracing::info!(slot = slot.index(), "No such hint for this step");
                }
                HintPurchaseOutcome::Ignored => {}
                HintPurchaseOutcome::Failed => tracing::warn!("Hint purchase failed; try again"),
            },
            Command::Retry => {
                if let Some(c) = ctx.as_mut() {
                    self.ensure_locked(c).await;
                    let outcome = self.engine.retry(c).await;
                    self.after_step(ctx, outcome);
                }
            }
            Command::Resume => {
                if let Some(c) = ctx.as_mut() {
                    self.ensure_locked(c).await;
                    let outcome = self.engine.resume(c).await;
                    self.after_step(ctx, outcome);
                }
            }
            Command::Leave => self.leave_play_screen(ctx.as_ref()).await,
            Command::Abandon => {
                let Some(c) = ctx.as_ref() else { return };
                match self.machine.abandon(c) {
                    TransitionOutcome::Rejected(e) => {
                        tracing::warn!(error = %e, "Cannot abandon");
                    }
                    _ => {
                        self.engine.leave();
                        *ctx = None;
                    }
                }
            }
            Command::Background => {
                self.notifier.set_foreground(false);
                self.leave_play_screen(ctx.as_ref()).await;
            }
            Command::Foreground => self.notifier.set_foreground(true),
            Command::Status => self.log_status(ctx.as_ref()),
            Command::Help => println!("{}", HELP),
        }
    }

    async fn refresh(&self, kind: PursuitKind) {
        for status in [
            PlaySessionStatus::Available,
            PlaySessionStatus::Pending,
            PlaySessionStatus::Playing,
        ] {
            if let Ok(records) = self.machine.refresh(kind, status).await {
                for record in records {
                    tracing::info!(
                        kind = %kind,
                        entity_id = %record.entity_id,
                        status = %record.status,
                        title = %record.title,
                        "Play record"
                    );
                }
            }
        }
        if let Ok(position) = self.sampler.current().await {
            let dropped = self.machine.sweep_available(kind, &position).await;
            if !dropped.is_empty() {
                tracing::info!(kind = %kind, count = dropped.len(), "Dropped out-of-range pursuits");
            }
        }
    }

    fn log_status(&self, ctx: Option<&SessionContext>) {
        let Some(ctx) = ctx else {
            tracing::info!("No active pursuit");
            return;
        };
        let status = self.machine.status_of(ctx.kind(), ctx.entity_id());
        let distance_m = ctx
            .locked_position()
            .map(|sample| ctx.evaluate(sample).distance_m);
        let step = match self.engine.state() {
            ProgressState::InStep(active) => format!(
                "{} #{} {:?}",
                active.step.action_type(),
                active.step.sequence(),
                active.progress
            ),
            other => format!("{:?}", other),
        };
        tracing::info!(
            kind = %ctx.kind(),
            entity_id = %ctx.entity_id(),
            title = %ctx.target().title,
            status = ?status,
            distance_m = ?distance_m,
            step = %step,
            "Status"
        );
    }
}

fn describe_step(step: &ActionStep) {
    let sequence = step.sequence();
    match step.payload() {
        ActionPayload::Talk { dialogue } => {
            tracing::info!(sequence, dialogue = %dialogue, "TALK: `ack` to continue");
        }
        ActionPayload::Stay { duration } => {
            tracing::info!(sequence, seconds = duration.total_secs(), "STAY: wait here");
        }
        ActionPayload::Walk { step_goal } => {
            tracing::info!(sequence, steps = step_goal, "WALK: keep moving");
        }
        ActionPayload::Puzzle { kind, question, .. } => {
            tracing::info!(sequence, kind = ?kind, question = %question, "PUZZLE");
        }
    }
}
