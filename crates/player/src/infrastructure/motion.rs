//! Simulated accelerometer producing a steady walking cadence.

use std::time::Duration;

use geoquest_domain::MotionSample;

use crate::ports::outbound::{sample_channel, MotionPort, SampleStream, SensorError};

const PEAK_MAGNITUDE: f64 = 12.5;
const REST_MAGNITUDE: f64 = 9.0;

/// Alternates peak and rest samples so each pair reads as one step.
#[derive(Debug, Clone)]
pub struct SimulatedMotion {
    step_interval: Duration,
}

impl SimulatedMotion {
    pub fn new(step_interval: Duration) -> Self {
        Self { step_interval }
    }
}

impl Default for SimulatedMotion {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

impl MotionPort for SimulatedMotion {
    fn subscribe(&self) -> Result<SampleStream<MotionSample>, SensorError> {
        let (feed, stream) = sample_channel(32);
        let half = self.step_interval / 2;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(half);
            let started = tokio::time::Instant::now();
            let mut peak = true;
            loop {
                tokio::select! {
                    _ = feed.closed() => break,
                    _ = ticker.tick() => {
                        let at_millis = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                        let magnitude = if peak { PEAK_MAGNITUDE } else { REST_MAGNITUDE };
                        peak = !peak;
                        if !feed.try_send(MotionSample::new(magnitude, at_millis)) {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("Simulated motion released");
        });
        Ok(stream)
    }
}
