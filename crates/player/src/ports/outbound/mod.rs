//! Outbound ports - Interfaces for external services
//!
//! These ports define the contracts that infrastructure adapters must implement,
//! allowing application services to interact with the backend and the device
//! without depending on concrete implementations.

pub mod backend_port;
pub mod notification_port;
pub mod platform;
pub mod sample_stream;
pub mod sensor_port;

pub use backend_port::{BackendError, HintPort, PlayRecordPort, QuestCursorPort};
pub use notification_port::{notification_keys, LocalNotification, NotificationError, NotificationPort};
pub use platform::{storage_keys, StorageProvider};
pub use sample_stream::{sample_channel, SampleFeed, SampleStream};
pub use sensor_port::{GeolocationPort, MotionPort, SensorError};

#[cfg(test)]
pub use backend_port::{MockHintPort, MockPlayRecordPort, MockQuestCursorPort};
#[cfg(test)]
pub use notification_port::MockNotificationPort;
#[cfg(test)]
pub use sensor_port::{MockGeolocationPort, MockMotionPort};
