//! Notification-driven re-entry.
//!
//! Turns "the player tapped a play notification" into the same entry the
//! player would reach by selecting the pursuit by hand. It never decides
//! geofence state itself.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use geoquest_domain::{DomainError, EntityId, PlayRecordId, PlayTarget, PursuitKind};
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use crate::ports::outbound::{notification_keys, LocalNotification, NotificationPort};

/// Screen a notification re-enters at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReentryScreen {
    /// Geofence tracking for the pursuit.
    Play,
    /// The quest's current action step.
    Action,
}

impl ReentryScreen {
    pub fn as_str(self) -> &'static str {
        match self {
            ReentryScreen::Play => "play",
            ReentryScreen::Action => "action",
        }
    }
}

impl fmt::Display for ReentryScreen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReentryScreen {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "play" => Ok(Self::Play),
            "action" => Ok(Self::Action),
            other => Err(DomainError::parse(format!("Unknown screen: {}", other))),
        }
    }
}

/// The target a tapped notification refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reentry {
    pub kind: PursuitKind,
    pub entity_id: EntityId,
    pub target_id: Option<PlayRecordId>,
    pub screen: ReentryScreen,
}

impl Reentry {
    pub fn for_target(target: &PlayTarget, screen: ReentryScreen) -> Self {
        Self {
            kind: target.kind,
            entity_id: target.entity_id.clone(),
            target_id: Some(target.target_id.clone()),
            screen,
        }
    }

    pub fn from_data(data: &HashMap<String, String>) -> Result<Self, DomainError> {
        let field = |key: &str| {
            data.get(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| DomainError::parse(format!("notification missing {}", key)))
        };
        Ok(Self {
            kind: field(notification_keys::KIND)?.parse()?,
            entity_id: EntityId::from(field(notification_keys::ENTITY_ID)?.as_str()),
            target_id: data
                .get(notification_keys::TARGET_ID)
                .filter(|v| !v.is_empty())
                .map(|v| PlayRecordId::from(v.as_str())),
            screen: data
                .get(notification_keys::SCREEN)
                .map_or(Ok(ReentryScreen::Play), |s| s.parse())?,
        })
    }

    pub fn to_data(&self) -> HashMap<String, String> {
        let mut data = HashMap::new();
        data.insert(notification_keys::KIND.to_string(), self.kind.to_string());
        data.insert(notification_keys::ENTITY_ID.to_string(), self.entity_id.to_string());
        if let Some(target_id) = &self.target_id {
            data.insert(notification_keys::TARGET_ID.to_string(), target_id.to_string());
        }
        data.insert(notification_keys::SCREEN.to_string(), self.screen.to_string());
        data
    }
}

pub struct BackgroundNotifier {
    notifications: Arc<dyn NotificationPort>,
    foreground: AtomicBool,
}

impl BackgroundNotifier {
    pub fn new(notifications: Arc<dyn NotificationPort>) -> Self {
        Self {
            notifications,
            foreground: AtomicBool::new(true),
        }
    }

    pub fn set_foreground(&self, foreground: bool) {
        self.foreground.store(foreground, Ordering::Release);
    }

    pub fn is_foreground(&self) -> bool {
        self.foreground.load(Ordering::Acquire)
    }

    /// Ask for the player's attention while the app is backgrounded.
    /// Returns whether a notification was scheduled.
    pub fn notify_attention(
        &self,
        target: &PlayTarget,
        screen: ReentryScreen,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> bool {
        if self.is_foreground() {
            return false;
        }
        let notification = LocalNotification {
            id: Uuid::new_v4(),
            title: title.into(),
            body: body.into(),
            data: Reentry::for_target(target, screen).to_data(),
        };
        match self.notifications.schedule(notification) {
            Ok(()) => {
                tracing::debug!(entity_id = %target.entity_id, screen = %screen, "Attention notification scheduled");
                true
            }
            Err(e) => {
                tracing::warn!(entity_id = %target.entity_id, error = %e, "Scheduling notification failed");
                false
            }
        }
    }

    /// Consume one tapped notification, if any.
    pub fn poll(&self) -> Option<Reentry> {
        let data = self.notifications.take_tapped()?;
        match Reentry::from_data(&data) {
            Ok(reentry) => {
                tracing::info!(
                    kind = %reentry.kind,
                    entity_id = %reentry.entity_id,
                    screen = %reentry.screen,
                    "Re-entering from notification"
                );
                Some(reentry)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed notification data");
                None
            }
        }
    }

    /// Poll on a fixed interval until shutdown, forwarding re-entries.
    pub async fn run(
        self: Arc<Self>,
        interval: Duration,
        reentries: mpsc::Sender<Reentry>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    while let Some(reentry) = self.poll() {
                        if reentries.send(reentry).await.is_err() {
                            return;
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::debug!("Notifier stopped");
                        return;
                    }
                }
            }
        }
    }
}
