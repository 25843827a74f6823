//! Hand-written fakes for multi-call scenarios where scripted responses and
//! observable call counts read better than mock expectations.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use geoquest_domain::{
    Coordinates, EntityId, LocationId, MotionSample, PlayRecord, PlayRecordId, PlaySessionStatus,
    PlayTarget, PursuitKind, QuestLocation, Reward, SessionHandle,
};
use tokio::sync::Notify;

use crate::application::dto::{ActionDetail, AnswerSubmission, AnswerVerdict, TransitionRequest};
use crate::application::services::LocalStateStore;
use crate::infrastructure::platform::MemoryStorageProvider;
use crate::ports::outbound::{
    sample_channel, BackendError, MotionPort, PlayRecordPort, QuestCursorPort, SampleFeed,
    SampleStream, SensorError,
};

pub fn memory_store() -> Arc<LocalStateStore> {
    Arc::new(LocalStateStore::new(Arc::new(MemoryStorageProvider::new())))
}

pub fn record(entity: &str, status: PlaySessionStatus) -> PlayRecord {
    PlayRecord {
        id: PlayRecordId::from(format!("rec-{}", entity)),
        entity_id: EntityId::from(entity),
        status,
        goal: Coordinates {
            latitude: 37.5512,
            longitude: 126.9882,
        },
        title: format!("Pursuit {}", entity),
        session_handle: None,
        reward: None,
    }
}

pub fn target(kind: PursuitKind, entity: &str) -> PlayTarget {
    let mut target = PlayTarget::from_record(kind, &record(entity, PlaySessionStatus::Playing));
    if kind == PursuitKind::Quest {
        target.session_handle = Some(SessionHandle::from(format!("session-{}", entity)));
    }
    target
}

pub fn location(id: &str, name: &str, latitude: f64, longitude: f64, end: bool) -> QuestLocation {
    QuestLocation {
        location_id: LocationId::from(id),
        name: name.to_string(),
        coordinates: Coordinates {
            latitude,
            longitude,
        },
        end_location: end,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Play-record backend that accepts every transition and records it.
#[derive(Default)]
pub struct RecordingPlayRecords {
    transitions: Mutex<Vec<(PursuitKind, PlaySessionStatus)>>,
    sent_from: Mutex<Vec<Coordinates>>,
}

impl RecordingPlayRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transitions(&self) -> Vec<(PursuitKind, PlaySessionStatus)> {
        lock(&self.transitions).clone()
    }

    /// Coordinates each transition request carried, in call order.
    pub fn sent_from(&self) -> Vec<Coordinates> {
        lock(&self.sent_from).clone()
    }
}

#[async_trait]
impl PlayRecordPort for RecordingPlayRecords {
    async fn transition(
        &self,
        kind: PursuitKind,
        to: PlaySessionStatus,
        request: &TransitionRequest,
    ) -> Result<PlayRecord, BackendError> {
        lock(&self.transitions).push((kind, to));
        lock(&self.sent_from).push(Coordinates {
            latitude: request.latitude,
            longitude: request.longitude,
        });
        let mut result = record(request.entity_id.as_str(), to);
        if to == PlaySessionStatus::Cleared {
            result.reward = Some(Reward {
                experience: 100,
                coin: 20,
                card_count: 1,
                card_tier: None,
            });
        }
        Ok(result)
    }

    async fn list(
        &self,
        _kind: PursuitKind,
        _status: PlaySessionStatus,
    ) -> Result<Vec<PlayRecord>, BackendError> {
        Ok(Vec::new())
    }

    async fn delete_available(
        &self,
        _kind: PursuitKind,
        _record_id: &PlayRecordId,
    ) -> Result<(), BackendError> {
        Ok(())
    }
}

/// Quest cursor serving a scripted sequence of action details.
#[derive(Default)]
pub struct ScriptedCursor {
    actions: Mutex<VecDeque<ActionDetail>>,
    verdicts: Mutex<VecDeque<bool>>,
    current_location: Mutex<Option<QuestLocation>>,
    next_location: Mutex<Option<QuestLocation>>,
    current_action_calls: AtomicUsize,
    next_location_calls: AtomicUsize,
    fail_next: AtomicBool,
    hold_next: AtomicBool,
    held: Notify,
    release: Notify,
}

impl ScriptedCursor {
    pub fn new(actions: Vec<ActionDetail>) -> Self {
        Self {
            actions: Mutex::new(actions.into()),
            ..Self::default()
        }
    }

    pub fn push_verdict(&self, answered: bool) {
        lock(&self.verdicts).push_back(answered);
    }

    pub fn set_current_location(&self, location: QuestLocation) {
        *lock(&self.current_location) = Some(location);
    }

    pub fn set_next_location(&self, location: QuestLocation) {
        *lock(&self.next_location) = Some(location);
    }

    pub fn current_action_calls(&self) -> usize {
        self.current_action_calls.load(Ordering::SeqCst)
    }

    pub fn next_location_calls(&self) -> usize {
        self.next_location_calls.load(Ordering::SeqCst)
    }

    /// The next `current_action` call fails without consuming a detail.
    pub fn fail_next_fetch(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// The next `current_action` call parks until [`release_held`](Self::release_held).
    pub fn hold_next_fetch(&self) {
        self.hold_next.store(true, Ordering::SeqCst);
    }

    pub async fn wait_until_held(&self) {
        self.held.notified().await;
    }

    pub fn release_held(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl QuestCursorPort for ScriptedCursor {
    async fn current_action(&self, _handle: &SessionHandle) -> Result<ActionDetail, BackendError> {
        self.current_action_calls.fetch_add(1, Ordering::SeqCst);
        if self.hold_next.swap(false, Ordering::SeqCst) {
            self.held.notify_one();
            self.release.notified().await;
        }
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(BackendError::Network("connection reset".into()));
        }
        lock(&self.actions).pop_front().ok_or(BackendError::NotFound)
    }

    async fn current_location(&self, _handle: &SessionHandle) -> Result<QuestLocation, BackendError> {
        lock(&self.current_location).clone().ok_or(BackendError::NotFound)
    }

    async fn next_location(&self, _handle: &SessionHandle) -> Result<QuestLocation, BackendError> {
        self.next_location_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.next_location).clone().ok_or(BackendError::NotFound)
    }

    async fn check_answer(
        &self,
        _handle: &SessionHandle,
        _submission: &AnswerSubmission,
    ) -> Result<AnswerVerdict, BackendError> {
        lock(&self.verdicts)
            .pop_front()
            .map(|answered| AnswerVerdict { answered })
            .ok_or_else(|| BackendError::Decode("no verdict scripted".into()))
    }
}

/// Motion source whose feed the test drives by hand.
#[derive(Default)]
pub struct ScriptedMotion {
    feed: Mutex<Option<SampleFeed<MotionSample>>>,
}

impl ScriptedMotion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_feed(&self) -> Option<SampleFeed<MotionSample>> {
        lock(&self.feed).take()
    }
}

impl MotionPort for ScriptedMotion {
    fn subscribe(&self) -> Result<SampleStream<MotionSample>, SensorError> {
        let (feed, stream) = sample_channel(16);
        *lock(&self.feed) = Some(feed);
        Ok(stream)
    }
}
