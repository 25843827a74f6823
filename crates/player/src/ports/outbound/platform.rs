//! Platform abstraction ports
//!
//! Persistent key-value storage used by the local state store. Desktop builds
//! back it with a JSON file; tests use the in-memory provider.

/// Persistent storage abstraction (file-based on desktop)
///
/// Implementations must make `save` atomic with respect to `load`: a reader
/// sees either the previous or the new value, never a partial one.
pub trait StorageProvider: Send + Sync {
    /// Save a string value with the given key
    fn save(&self, key: &str, value: &str);

    /// Load a string value by key, returns None if not found
    fn load(&self, key: &str) -> Option<String>;

    /// Remove a value by key
    fn remove(&self, key: &str);
}

/// Storage key constants
///
/// These are kept in the ports layer as they define the contract for
/// what keys are used across the application.
pub mod storage_keys {
    use geoquest_domain::PursuitKind;

    pub const ACTIVE_TARGET: &str = "geoquest_active_target";
    pub const RESUME_POINTER: &str = "geoquest_resume_pointer";
    pub const RUNNING_TREASURE: &str = "geoquest_running_treasure";
    pub const RUNNING_QUEST: &str = "geoquest_running_quest";
    pub const LAST_KNOWN_STATUS: &str = "geoquest_last_known_status";

    /// Running-target index key for one pursuit kind.
    pub fn running_targets(kind: PursuitKind) -> &'static str {
        match kind {
            PursuitKind::Treasure => RUNNING_TREASURE,
            PursuitKind::Quest => RUNNING_QUEST,
        }
    }
}
