//! In-process notification center for desktop runs.
//!
//! Scheduled notifications are logged; taps are injected with
//! [`LocalNotificationCenter::tap`] (from a test or a debug command). A new
//! notification replaces an untapped one for the same pursuit, and at most
//! [`MAX_DELIVERED`] stay on display.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::ports::outbound::{
    notification_keys, LocalNotification, NotificationError, NotificationPort,
};

pub const MAX_DELIVERED: usize = 16;

fn same_pursuit(a: &LocalNotification, b: &LocalNotification) -> bool {
    let key = |n: &LocalNotification| {
        (
            n.data.get(notification_keys::KIND).cloned(),
            n.data.get(notification_keys::ENTITY_ID).cloned(),
        )
    };
    let (kind, entity) = key(a);
    entity.is_some() && (kind, entity) == key(b)
}

#[derive(Default)]
struct Center {
    delivered: Vec<LocalNotification>,
    tapped: VecDeque<HashMap<String, String>>,
}

pub struct LocalNotificationCenter {
    permitted: bool,
    center: Mutex<Center>,
}

impl LocalNotificationCenter {
    pub fn new(permitted: bool) -> Self {
        Self {
            permitted,
            center: Mutex::new(Center::default()),
        }
    }

    pub fn delivered(&self) -> Vec<LocalNotification> {
        self.lock().delivered.clone()
    }

    /// Simulate the player tapping a delivered notification.
    pub fn tap(&self, id: Uuid) -> bool {
        let mut center = self.lock();
        let Some(index) = center.delivered.iter().position(|n| n.id == id) else {
            return false;
        };
        let notification = center.delivered.remove(index);
        center.tapped.push_back(notification.data);
        true
    }

    fn lock(&self) -> MutexGuard<'_, Center> {
        self.center.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for LocalNotificationCenter {
    fn default() -> Self {
        Self::new(true)
    }
}

impl NotificationPort for LocalNotificationCenter {
    fn schedule(&self, notification: LocalNotification) -> Result<(), NotificationError> {
        if !self.permitted {
            return Err(NotificationError::NotPermitted);
        }
        tracing::info!(
            id = %notification.id,
            title = %notification.title,
            body = %notification.body,
            "Notification delivered"
        );
        let mut center = self.lock();
        center.delivered.retain(|shown| !same_pursuit(shown, &notification));
        if center.delivered.len() >= MAX_DELIVERED {
            center.delivered.remove(0);
        }
        center.delivered.push(notification);
        Ok(())
    }

    fn take_tapped(&self) -> Option<HashMap<String, String>> {
        self.lock().tapped.pop_front()
    }
}
