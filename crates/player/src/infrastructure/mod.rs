//! Infrastructure adapters for the outbound ports.

pub mod geolocation;
pub mod http_client;
pub mod motion;
pub mod notifications;
pub mod platform;
pub mod settings;

pub use geolocation::SimulatedGeolocation;
pub use http_client::RestBackend;
pub use motion::SimulatedMotion;
pub use notifications::LocalNotificationCenter;
pub use platform::{FileStorageProvider, MemoryStorageProvider};
pub use settings::Settings;
