//! Position reads on top of the device geolocation provider.

use std::sync::Arc;

use geoquest_domain::{
    Coordinates, GeofenceEvaluator, GeofenceReading, PositionSample, ThresholdSet,
};

use crate::ports::outbound::{GeolocationPort, SampleStream, SensorError};

/// The sample that satisfied a lock predicate, frozen for the backend call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeofenceLock {
    pub sample: PositionSample,
    pub reading: GeofenceReading,
}

pub struct GeoSampler {
    geolocation: Arc<dyn GeolocationPort>,
}

impl GeoSampler {
    pub fn new(geolocation: Arc<dyn GeolocationPort>) -> Self {
        Self { geolocation }
    }

    pub async fn current(&self) -> Result<PositionSample, SensorError> {
        self.geolocation.current_position().await
    }

    pub fn watch(&self) -> Result<SampleStream<PositionSample>, SensorError> {
        self.geolocation.watch_position()
    }

    /// Watch until a sample's reading against `goal` satisfies `matters`, then
    /// stop the watch and return that sample.
    ///
    /// Returns `Ok(None)` if the provider ends the stream first.
    pub async fn lock_on<F>(
        &self,
        goal: Coordinates,
        thresholds: ThresholdSet,
        matters: F,
    ) -> Result<Option<GeofenceLock>, SensorError>
    where
        F: Fn(&GeofenceReading) -> bool,
    {
        let mut stream = self.watch()?;
        while let Some(sample) = stream.next().await {
            let reading = GeofenceEvaluator::evaluate(&sample.coordinates, &goal, &thresholds);
            tracing::trace!(
                distance_m = reading.distance_m,
                class = ?reading.class,
                "Position sample"
            );
            if matters(&reading) {
                stream.stop();
                tracing::debug!(
                    distance_m = reading.distance_m,
                    class = ?reading.class,
                    "Geofence locked"
                );
                return Ok(Some(GeofenceLock { sample, reading }));
            }
        }
        tracing::debug!("Position watch ended before a geofence lock");
        Ok(None)
    }
}
