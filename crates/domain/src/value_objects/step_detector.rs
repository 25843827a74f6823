//! Pedometer: counts steps from accelerometer magnitude peaks.

use serde::{Deserialize, Serialize};

/// Magnitude of the acceleration vector (m/s^2) at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    pub magnitude: f64,
    pub at_millis: u64,
}

impl MotionSample {
    pub fn new(magnitude: f64, at_millis: u64) -> Self {
        Self {
            magnitude,
            at_millis,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepDetectorConfig {
    /// A rising edge above this magnitude counts as a peak.
    pub peak_threshold: f64,
    /// The detector re-arms once the signal falls below this magnitude.
    pub rearm_threshold: f64,
    /// Peaks closer together than this are treated as one step.
    pub min_interval_ms: u64,
}

impl Default for StepDetectorConfig {
    fn default() -> Self {
        Self {
            peak_threshold: 11.5,
            rearm_threshold: 10.0,
            min_interval_ms: 250,
        }
    }
}

/// Peak detector with hysteresis and a refractory interval.
#[derive(Debug, Clone)]
pub struct StepDetector {
    config: StepDetectorConfig,
    armed: bool,
    last_peak_ms: Option<u64>,
    steps: u32,
}

impl StepDetector {
    pub fn new(config: StepDetectorConfig) -> Self {
        Self {
            config,
            armed: true,
            last_peak_ms: None,
            steps: 0,
        }
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Feed one sample; returns true when it completed a step.
    pub fn push(&mut self, sample: MotionSample) -> bool {
        if !self.armed {
            if sample.magnitude < self.config.rearm_threshold {
                self.armed = true;
            }
            return false;
        }

        if sample.magnitude < self.config.peak_threshold {
            return false;
        }

        // Above threshold while armed: a peak, unless it is inside the refractory window.
        self.armed = false;
        let too_soon = self
            .last_peak_ms
            .is_some_and(|last| sample.at_millis.saturating_sub(last) < self.config.min_interval_ms);
        if too_soon {
            return false;
        }
        self.last_peak_ms = Some(sample.at_millis);
        self.steps += 1;
        true
    }
}

impl Default for StepDetector {
    fn default() -> Self {
        Self::new(StepDetectorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(detector: &mut StepDetector, peaks: u32, spacing_ms: u64) -> u32 {
        let mut counted = 0;
        for i in 0..u64::from(peaks) {
            let t = i * spacing_ms;
            if detector.push(MotionSample::new(12.5, t)) {
                counted += 1;
            }
            detector.push(MotionSample::new(9.0, t + spacing_ms / 2));
        }
        counted
    }

    #[test]
    fn counts_one_step_per_peak() {
        let mut detector = StepDetector::default();
        assert_eq!(walk(&mut detector, 50, 500), 50);
        assert_eq!(detector.steps(), 50);
    }

    #[test]
    fn plateau_above_threshold_is_a_single_step() {
        let mut detector = StepDetector::default();
        for t in 0..10 {
            detector.push(MotionSample::new(13.0, t * 20));
        }
        assert_eq!(detector.steps(), 1);
    }

    #[test]
    fn peaks_inside_refractory_window_are_ignored() {
        let mut detector = StepDetector::default();
        assert_eq!(walk(&mut detector, 10, 125), 5);
    }

    #[test]
    fn small_oscillations_never_count() {
        let mut detector = StepDetector::default();
        for t in 0..100 {
            let magnitude = if t % 2 == 0 { 10.5 } else { 9.5 };
            detector.push(MotionSample::new(magnitude, t * 300));
        }
        assert_eq!(detector.steps(), 0);
    }
}
