//! Simulated geolocation provider replaying a recorded track.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use geoquest_domain::{Coordinates, PositionSample};

use crate::ports::outbound::{sample_channel, GeolocationPort, SampleStream, SensorError};

/// Replays `track` one point per `interval`, holding the last point once the
/// track is exhausted.
#[derive(Clone)]
pub struct SimulatedGeolocation {
    track: Arc<Vec<Coordinates>>,
    interval: Duration,
    accuracy_m: f64,
    cursor: Arc<Mutex<usize>>,
}

impl SimulatedGeolocation {
    pub fn new(track: Vec<Coordinates>, interval: Duration) -> Self {
        Self {
            track: Arc::new(track),
            interval,
            accuracy_m: 5.0,
            cursor: Arc::new(Mutex::new(0)),
        }
    }

    /// A provider that never moves.
    pub fn stationary(at: Coordinates) -> Self {
        Self::new(vec![at], Duration::from_secs(1))
    }

    /// Load a JSON array of `{latitude, longitude}` points.
    pub fn from_file(path: &Path, interval: Duration) -> Result<Self, SensorError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| SensorError::Unavailable(format!("{}: {}", path.display(), e)))?;
        let track: Vec<Coordinates> = serde_json::from_str(&data)
            .map_err(|e| SensorError::Unavailable(format!("invalid track: {}", e)))?;
        if let Some(bad) = track.iter().find(|c| !c.is_valid()) {
            return Err(SensorError::Unavailable(format!(
                "track point out of range: ({}, {})",
                bad.latitude, bad.longitude
            )));
        }
        tracing::info!(path = %path.display(), points = track.len(), "Loaded simulated track");
        Ok(Self::new(track, interval))
    }

    fn point_at(&self, index: usize) -> Option<Coordinates> {
        self.track
            .get(index)
            .or_else(|| self.track.last())
            .copied()
    }

    fn sample(&self, coordinates: Coordinates) -> PositionSample {
        PositionSample::new(coordinates, Some(self.accuracy_m), Utc::now())
    }
}

#[async_trait]
impl GeolocationPort for SimulatedGeolocation {
    async fn current_position(&self) -> Result<PositionSample, SensorError> {
        let index = *self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        self.point_at(index)
            .map(|c| self.sample(c))
            .ok_or_else(|| SensorError::Unavailable("empty track".into()))
    }

    fn watch_position(&self) -> Result<SampleStream<PositionSample>, SensorError> {
        if self.track.is_empty() {
            return Err(SensorError::Unavailable("empty track".into()));
        }
        let (feed, stream) = sample_channel(4);
        let provider = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(provider.interval);
            loop {
                tokio::select! {
                    _ = feed.closed() => break,
                    _ = ticker.tick() => {
                        let index = {
                            let mut cursor = provider.cursor.lock().unwrap_or_else(PoisonError::into_inner);
                            let index = *cursor;
                            if index + 1 < provider.track.len() {
                                *cursor += 1;
                            }
                            index
                        };
                        let Some(point) = provider.point_at(index) else { break };
                        if !feed.send(provider.sample(point)).await {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("Simulated position watch released");
        });
        Ok(stream)
    }
}
