//! Local notification scheduling and tap consumption.

use std::collections::HashMap;

use uuid::Uuid;

/// Literal custom data fields carried by play notifications.
pub mod notification_keys {
    pub const KIND: &str = "kind";
    pub const ENTITY_ID: &str = "entityId";
    pub const TARGET_ID: &str = "targetId";
    pub const SCREEN: &str = "screen";
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalNotification {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub data: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NotificationError {
    #[error("Notifications not permitted")]
    NotPermitted,
    #[error("Scheduling failed: {0}")]
    Failed(String),
}

#[cfg_attr(test, mockall::automock)]
pub trait NotificationPort: Send + Sync {
    fn schedule(&self, notification: LocalNotification) -> Result<(), NotificationError>;

    /// Data of the oldest notification the user tapped and nobody consumed yet.
    fn take_tapped(&self) -> Option<HashMap<String, String>>;
}
