//! Durable key -> JSON state: active target, resume pointer, running-target
//! indexes and the last-known play-record index.
//!
//! Reads never fail: a missing or corrupt value is treated as first-run
//! state and logged. Atomicity of a single write is the storage provider's
//! job; this store only serializes its own read-modify-write sequences.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use geoquest_domain::{
    Coordinates, EntityId, PlayRecord, PlayRecordId, PlaySessionStatus, PlayTarget, PursuitKind,
    ResumePointer, SessionHandle,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::ports::outbound::{storage_keys, StorageProvider};

/// entityId -> last known status for one pursuit kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunningTargetIndex {
    entries: BTreeMap<EntityId, PlaySessionStatus>,
}

impl RunningTargetIndex {
    pub fn get(&self, entity_id: &EntityId) -> Option<PlaySessionStatus> {
        self.entries.get(entity_id).copied()
    }

    pub fn set(&mut self, entity_id: EntityId, status: PlaySessionStatus) {
        self.entries.insert(entity_id, status);
    }

    pub fn remove(&mut self, entity_id: &EntityId) -> Option<PlaySessionStatus> {
        self.entries.remove(entity_id)
    }

    pub fn with_status(&self, status: PlaySessionStatus) -> Vec<EntityId> {
        self.entries
            .iter()
            .filter(|(_, s)| **s == status)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What the last backend response said about an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnownRecord {
    pub record_id: PlayRecordId,
    pub status: PlaySessionStatus,
    pub goal: Coordinates,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_handle: Option<SessionHandle>,
}

impl KnownRecord {
    /// Rebuild a play target for an entity from its last known record.
    pub fn to_target(&self, kind: PursuitKind, entity_id: &EntityId) -> PlayTarget {
        PlayTarget {
            target_id: self.record_id.clone(),
            entity_id: entity_id.clone(),
            kind,
            goal: self.goal,
            title: self.title.clone(),
            reward: None,
            session_handle: self.session_handle.clone(),
        }
    }
}

impl From<&PlayRecord> for KnownRecord {
    fn from(record: &PlayRecord) -> Self {
        Self {
            record_id: record.id.clone(),
            status: record.status,
            goal: record.goal,
            title: record.title.clone(),
            session_handle: record.session_handle.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct LastKnownIndex {
    #[serde(default)]
    treasure: BTreeMap<EntityId, KnownRecord>,
    #[serde(default)]
    quest: BTreeMap<EntityId, KnownRecord>,
}

impl LastKnownIndex {
    fn for_kind(&self, kind: PursuitKind) -> &BTreeMap<EntityId, KnownRecord> {
        match kind {
            PursuitKind::Treasure => &self.treasure,
            PursuitKind::Quest => &self.quest,
        }
    }

    fn for_kind_mut(&mut self, kind: PursuitKind) -> &mut BTreeMap<EntityId, KnownRecord> {
        match kind {
            PursuitKind::Treasure => &mut self.treasure,
            PursuitKind::Quest => &mut self.quest,
        }
    }
}

pub struct LocalStateStore {
    storage: Arc<dyn StorageProvider>,
    write_lock: Mutex<()>,
}

impl LocalStateStore {
    pub fn new(storage: Arc<dyn StorageProvider>) -> Self {
        Self {
            storage,
            write_lock: Mutex::new(()),
        }
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.storage.load(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "Discarding corrupt local state");
                None
            }
        }
    }

    fn write<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(raw) => self.storage.save(key, &raw),
            Err(e) => tracing::warn!(key, error = %e, "Failed to serialize local state"),
        }
    }

    fn update<T, F>(&self, key: &str, change: F)
    where
        T: DeserializeOwned + Serialize + Default,
        F: FnOnce(&mut T),
    {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut value: T = self.read(key).unwrap_or_default();
        change(&mut value);
        self.write(key, &value);
    }

    // --- active target ---

    pub fn active_target(&self) -> Option<PlayTarget> {
        self.read(storage_keys::ACTIVE_TARGET)
    }

    pub fn save_active_target(&self, target: &PlayTarget) {
        self.write(storage_keys::ACTIVE_TARGET, target);
    }

    pub fn clear_active_target(&self) {
        self.storage.remove(storage_keys::ACTIVE_TARGET);
    }

    // --- resume pointer ---

    pub fn resume_pointer(&self) -> Option<ResumePointer> {
        self.read(storage_keys::RESUME_POINTER)
    }

    pub fn save_resume_pointer(&self, pointer: &ResumePointer) {
        self.write(storage_keys::RESUME_POINTER, pointer);
    }

    pub fn clear_resume_pointer(&self) {
        self.storage.remove(storage_keys::RESUME_POINTER);
    }

    /// Forget the pursuit in progress: active target and resume pointer.
    pub fn clear_session(&self) {
        self.clear_active_target();
        self.clear_resume_pointer();
    }

    // --- running-target index ---

    pub fn running_index(&self, kind: PursuitKind) -> RunningTargetIndex {
        self.read(storage_keys::running_targets(kind))
            .unwrap_or_default()
    }

    pub fn status_of(&self, kind: PursuitKind, entity_id: &EntityId) -> Option<PlaySessionStatus> {
        self.running_index(kind).get(entity_id)
    }

    pub fn record_status(&self, kind: PursuitKind, entity_id: &EntityId, status: PlaySessionStatus) {
        self.update(storage_keys::running_targets(kind), |index: &mut RunningTargetIndex| {
            index.set(entity_id.clone(), status)
        });
    }

    // --- last-known records ---

    pub fn known_record(&self, kind: PursuitKind, entity_id: &EntityId) -> Option<KnownRecord> {
        self.read::<LastKnownIndex>(storage_keys::LAST_KNOWN_STATUS)?
            .for_kind(kind)
            .get(entity_id)
            .cloned()
    }

    pub fn known_records(&self, kind: PursuitKind) -> Vec<(EntityId, KnownRecord)> {
        self.read::<LastKnownIndex>(storage_keys::LAST_KNOWN_STATUS)
            .unwrap_or_default()
            .for_kind(kind)
            .iter()
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect()
    }

    /// Write an authoritative backend record through to both indexes.
    pub fn remember_record(&self, kind: PursuitKind, record: &PlayRecord) {
        self.record_status(kind, &record.entity_id, record.status);
        self.update(storage_keys::LAST_KNOWN_STATUS, |index: &mut LastKnownIndex| {
            index
                .for_kind_mut(kind)
                .insert(record.entity_id.clone(), KnownRecord::from(record));
        });
    }

    /// Return an entity to "untracked" in both indexes.
    pub fn forget(&self, kind: PursuitKind, entity_id: &EntityId) {
        self.update(storage_keys::running_targets(kind), |index: &mut RunningTargetIndex| {
            index.remove(entity_id);
        });
        self.update(storage_keys::LAST_KNOWN_STATUS, |index: &mut LastKnownIndex| {
            index.for_kind_mut(kind).remove(entity_id);
        });
    }
}
