//! Data models for dronewatch
//!
//! Wire types for the detection backend (latest result, event records, worker
//! status, log tail) and the user-owned poll configuration.
//!
//! Field names follow what the backend actually emits (`pred`, `spec_shape`,
//! `latency_ms`); the Rust names describe the meaning.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

/// Smallest poll interval the scheduler will run at
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Default poll interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(800);

/// Default number of events requested per poll
pub const DEFAULT_EVENTS_LIMIT: u32 = 20;

/// Largest events window the backend keeps
pub const MAX_EVENTS_LIMIT: u32 = 500;

/// Whether the worker has produced a result yet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LatestStatus {
    #[default]
    Ok,
    /// Backend has no result yet (worker never started)
    NoData,
}

impl<'de> Deserialize<'de> for LatestStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(match raw.as_deref() {
            Some("no data yet") | Some("no_data") => LatestStatus::NoData,
            _ => LatestStatus::Ok,
        })
    }
}

/// Most recent output of the detection worker
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LatestResult {
    #[serde(default)]
    pub status: LatestStatus,
    /// Human-readable class name
    #[serde(default)]
    pub label: Option<String>,
    /// Raw class index from the classifier
    #[serde(default, rename = "pred", alias = "predicted_class")]
    pub predicted_class: Option<i64>,
    /// Softmax confidence in [0, 1]
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Whether the result crossed the threshold for a non-noise class
    #[serde(default)]
    pub detected: bool,
    #[serde(default)]
    pub latency_ms: Option<f64>,
    /// Unix seconds
    #[serde(default, deserialize_with = "unix_seconds")]
    pub timestamp: Option<i64>,
    /// Shape of the spectrogram fed to the model
    #[serde(default, rename = "spec_shape", alias = "input_shape")]
    pub input_shape: Vec<i64>,
    /// Threshold the backend enforced for this result
    #[serde(default)]
    pub threshold: Option<f64>,
}

impl LatestResult {
    /// The placeholder the backend serves before the worker has run
    pub fn no_data() -> Self {
        Self {
            status: LatestStatus::NoData,
            ..Self::default()
        }
    }
}

/// A past detection that crossed the threshold
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EventRecord {
    #[serde(default, deserialize_with = "unix_seconds")]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub latency_ms: Option<f64>,
}

/// `/events` answers either a bare list or `{ "events": [...] }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum EventsPayload {
    List(Vec<EventRecord>),
    Wrapped {
        #[serde(default)]
        events: Vec<EventRecord>,
    },
}

impl EventsPayload {
    pub(crate) fn into_events(self) -> Vec<EventRecord> {
        match self {
            EventsPayload::List(events) | EventsPayload::Wrapped { events } => events,
        }
    }
}

/// Answer to `/start` and `/stop`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkerStatus {
    #[serde(default)]
    pub status: Option<String>,
}

impl WorkerStatus {
    /// Status text, `"ok"` if the backend left it out
    pub fn describe(&self) -> &str {
        self.status.as_deref().unwrap_or("ok")
    }
}

/// Answer to `/settings`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SettingsResponse {
    pub threshold: f64,
}

/// Tail of the backend's log file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogTail {
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub lines: Vec<String>,
}

/// How often to poll and how many events to ask for
///
/// Construct through [`PollConfig::new`] so both fields are clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    interval: Duration,
    events_limit: u32,
}

impl PollConfig {
    /// Build a config, clamping the interval to at least 250ms and the
    /// events limit to `1..=500`
    pub fn new(interval: Duration, events_limit: u32) -> Self {
        Self {
            interval: interval.max(MIN_POLL_INTERVAL),
            events_limit: events_limit.clamp(1, MAX_EVENTS_LIMIT),
        }
    }

    pub fn from_millis(interval_ms: u64, events_limit: u32) -> Self {
        Self::new(Duration::from_millis(interval_ms), events_limit)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn events_limit(&self) -> u32 {
        self.events_limit
    }

    /// Same limit, new interval
    pub fn with_interval(self, interval: Duration) -> Self {
        Self::new(interval, self.events_limit)
    }

    /// Same interval, new limit
    pub fn with_events_limit(self, events_limit: u32) -> Self {
        Self::new(self.interval, events_limit)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_EVENTS_LIMIT)
    }
}

/// Accept integer or float unix timestamps, truncating to whole seconds
fn unix_seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let raw = Option::<f64>::deserialize(deserializer)?;
    Ok(raw.filter(|ts| ts.is_finite()).map(|ts| ts as i64))
}
