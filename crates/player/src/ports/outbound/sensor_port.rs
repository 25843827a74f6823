//! Device sensor ports: geolocation and motion.

use async_trait::async_trait;
use geoquest_domain::{MotionSample, PositionSample};

use super::SampleStream;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SensorError {
    #[error("Permission denied")]
    PermissionDenied,
    #[error("Sensor unavailable: {0}")]
    Unavailable(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GeolocationPort: Send + Sync {
    /// One-shot position read.
    async fn current_position(&self) -> Result<PositionSample, SensorError>;

    /// Continuous position watch; stopping the stream releases the provider.
    fn watch_position(&self) -> Result<SampleStream<PositionSample>, SensorError>;
}

#[cfg_attr(test, mockall::automock)]
pub trait MotionPort: Send + Sync {
    /// Accelerometer magnitude samples until the stream is stopped.
    fn subscribe(&self) -> Result<SampleStream<MotionSample>, SensorError>;
}
