//! Geofence classification against named distance thresholds.
//!
//! Arrival and trackable radii are nested: a position is classified by the
//! smallest of the two it falls within, or `Outside`. The available radius is
//! a discovery boundary that can be smaller or larger than the trackable one,
//! so it is queried with [`GeofenceReading::within`] instead of being folded
//! into the class.

use serde::{Deserialize, Serialize};

use super::Coordinates;

/// Named distance boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Threshold {
    Arrival,
    /// Pending-exit radius: beyond it a paused pursuit is no longer tracked.
    Trackable,
    Available,
}

/// Result of classifying a distance against a threshold set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeofenceClass {
    Arrival,
    Trackable,
    Outside,
}

/// Per-kind distance thresholds in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSet {
    pub arrival_m: f64,
    pub trackable_m: f64,
    pub available_m: f64,
}

impl ThresholdSet {
    /// Quest defaults: 15 m arrival, 5 km pending-exit, 1 km available.
    pub const QUEST: ThresholdSet = ThresholdSet {
        arrival_m: 15.0,
        trackable_m: 5_000.0,
        available_m: 1_000.0,
    };

    /// Treasure-hunt defaults: 1.5 m arrival, 1 km pending-exit, 1 km available.
    pub const TREASURE: ThresholdSet = ThresholdSet {
        arrival_m: 1.5,
        trackable_m: 1_000.0,
        available_m: 1_000.0,
    };

    pub fn radius(&self, threshold: Threshold) -> f64 {
        match threshold {
            Threshold::Arrival => self.arrival_m,
            Threshold::Trackable => self.trackable_m,
            Threshold::Available => self.available_m,
        }
    }
}

/// Distance from a position to a goal plus its classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeofenceReading {
    pub distance_m: f64,
    pub class: GeofenceClass,
    thresholds: ThresholdSet,
}

impl GeofenceReading {
    /// True when the distance is within (inclusive) the named radius.
    pub fn within(&self, threshold: Threshold) -> bool {
        self.distance_m <= self.thresholds.radius(threshold)
    }

    pub fn thresholds(&self) -> &ThresholdSet {
        &self.thresholds
    }
}

/// Stateless geofence evaluation.
pub struct GeofenceEvaluator;

impl GeofenceEvaluator {
    pub fn evaluate(
        position: &Coordinates,
        goal: &Coordinates,
        thresholds: &ThresholdSet,
    ) -> GeofenceReading {
        let distance_m = position.distance_to(goal);
        GeofenceReading {
            distance_m,
            class: Self::classify(distance_m, thresholds),
            thresholds: *thresholds,
        }
    }

    pub fn classify(distance_m: f64, thresholds: &ThresholdSet) -> GeofenceClass {
        if distance_m <= thresholds.arrival_m {
            GeofenceClass::Arrival
        } else if distance_m <= thresholds.trackable_m {
            GeofenceClass::Trackable
        } else {
            GeofenceClass::Outside
        }
    }
}
