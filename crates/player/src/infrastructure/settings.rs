//! Environment-driven settings.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use geoquest_domain::ThresholdSet;

use crate::application::services::PursuitThresholds;
use crate::infrastructure::http_client::DEFAULT_API_URL;
use crate::infrastructure::platform::default_storage_path;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_NOTIFIER_INTERVAL_MS: u64 = 500;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_url: String,
    pub api_token: Option<String>,
    pub request_timeout: Duration,
    pub notifier_interval: Duration,
    pub thresholds: PursuitThresholds,
    pub storage_path: PathBuf,
    pub simulated_track: Option<PathBuf>,
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary lookup; unset keys take defaults and
    /// unparseable ones fall back to defaults with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let quest = ThresholdSet::QUEST;
        let treasure = ThresholdSet::TREASURE;

        Self {
            api_url: get("GEOQUEST_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            api_token: get("GEOQUEST_API_TOKEN"),
            request_timeout: Duration::from_secs(parse_or(
                &get,
                "GEOQUEST_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )),
            notifier_interval: Duration::from_millis(parse_or(
                &get,
                "GEOQUEST_NOTIFIER_INTERVAL_MS",
                DEFAULT_NOTIFIER_INTERVAL_MS,
            )),
            thresholds: PursuitThresholds {
                quest: ThresholdSet {
                    arrival_m: parse_or(&get, "GEOQUEST_QUEST_ARRIVAL_M", quest.arrival_m),
                    trackable_m: parse_or(&get, "GEOQUEST_QUEST_TRACKABLE_M", quest.trackable_m),
                    available_m: parse_or(&get, "GEOQUEST_QUEST_AVAILABLE_M", quest.available_m),
                },
                treasure: ThresholdSet {
                    arrival_m: parse_or(&get, "GEOQUEST_TREASURE_ARRIVAL_M", treasure.arrival_m),
                    trackable_m: parse_or(
                        &get,
                        "GEOQUEST_TREASURE_TRACKABLE_M",
                        treasure.trackable_m,
                    ),
                    available_m: parse_or(
                        &get,
                        "GEOQUEST_TREASURE_AVAILABLE_M",
                        treasure.available_m,
                    ),
                },
            },
            storage_path: get("GEOQUEST_STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(default_storage_path),
            simulated_track: get("GEOQUEST_SIMULATED_TRACK").map(PathBuf::from),
        }
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, default = %default, "Invalid setting; using default");
            default
        }),
    }
}
