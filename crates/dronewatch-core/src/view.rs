//! View projection
//!
//! Turns raw backend payloads into display-ready strings. [`project`] is a
//! pure function of its inputs; two calls with equal inputs produce equal
//! [`ViewModel`]s, which is what lets the engine skip publishing (and the
//! renderer skip drawing) when a poll brought nothing new.

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::models::{EventRecord, LatestResult, LatestStatus};

/// Shown for any missing value
pub const MISSING: &str = "-";

/// Why the latest panel has nothing to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmptyReason {
    /// Nothing has been fetched yet
    NoData,
    /// Backend answered, but the worker has not produced a result
    NotStarted,
}

impl EmptyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmptyReason::NoData => "no-data",
            EmptyReason::NotStarted => "not-started",
        }
    }

    /// Operator-facing explanation
    pub fn message(&self) -> &'static str {
        match self {
            EmptyReason::NoData => "No data yet",
            EmptyReason::NotStarted => "No data yet (press s to start)",
        }
    }
}

/// Binary classification of the latest result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Detection {
    Detected,
    Noise,
}

impl Detection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Detection::Detected => "DETECTED",
            Detection::Noise => "NOISE",
        }
    }
}

impl std::fmt::Display for Detection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Populated latest-result panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LatestPanel {
    pub label: String,
    pub predicted_class: String,
    pub confidence: String,
    pub detection: Detection,
    pub latency: String,
    pub timestamp: String,
    pub input_shape: String,
    /// Threshold the backend enforced (or the confirmed one as fallback)
    pub threshold: String,
}

/// Latest-result panel, empty or populated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LatestView {
    Empty { reason: EmptyReason },
    Populated(LatestPanel),
}

/// One row of the events table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRow {
    pub timestamp: String,
    pub label: String,
    pub confidence: String,
    pub latency: String,
}

/// Everything the renderer needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewModel {
    pub latest: LatestView,
    pub events: Vec<EventRow>,
}

impl ViewModel {
    /// Whether the latest panel is empty
    pub fn is_empty(&self) -> bool {
        matches!(self.latest, LatestView::Empty { .. })
    }

    /// Reason the latest panel is empty, if it is
    pub fn empty_reason(&self) -> Option<EmptyReason> {
        match self.latest {
            LatestView::Empty { reason } => Some(reason),
            LatestView::Populated(_) => None,
        }
    }

    /// The populated panel, if any
    pub fn panel(&self) -> Option<&LatestPanel> {
        match &self.latest {
            LatestView::Populated(panel) => Some(panel),
            LatestView::Empty { .. } => None,
        }
    }
}

impl Default for ViewModel {
    fn default() -> Self {
        project(None, None, &[])
    }
}

/// Derive the view model from raw state
pub fn project(
    latest: Option<&LatestResult>,
    confirmed: Option<f64>,
    events: &[EventRecord],
) -> ViewModel {
    let latest = match latest {
        None => LatestView::Empty {
            reason: EmptyReason::NoData,
        },
        Some(result) if result.status == LatestStatus::NoData => LatestView::Empty {
            reason: EmptyReason::NotStarted,
        },
        Some(result) => LatestView::Populated(project_latest(result, confirmed)),
    };

    ViewModel {
        latest,
        events: events.iter().map(project_event).collect(),
    }
}

fn project_latest(result: &LatestResult, confirmed: Option<f64>) -> LatestPanel {
    LatestPanel {
        label: text_or_missing(result.label.as_deref()),
        predicted_class: result
            .predicted_class
            .map(|p| p.to_string())
            .unwrap_or_else(|| MISSING.to_string()),
        confidence: format_confidence(result.confidence),
        detection: if result.detected {
            Detection::Detected
        } else {
            Detection::Noise
        },
        latency: format_latency(result.latency_ms),
        timestamp: format_timestamp(result.timestamp),
        input_shape: format_shape(&result.input_shape),
        threshold: format_confidence(result.threshold.or(confirmed)),
    }
}

fn project_event(event: &EventRecord) -> EventRow {
    EventRow {
        timestamp: format_timestamp(event.timestamp),
        label: text_or_missing(event.label.as_deref()),
        confidence: format_confidence(event.confidence),
        latency: format_latency(event.latency_ms),
    }
}

fn text_or_missing(value: Option<&str>) -> String {
    value.unwrap_or(MISSING).to_string()
}

/// Three decimals, used for confidences and thresholds
pub fn format_confidence(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.3}", v),
        _ => MISSING.to_string(),
    }
}

pub fn format_latency(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.1} ms", v),
        _ => MISSING.to_string(),
    }
}

/// Local date-time; zero counts as missing
pub fn format_timestamp(value: Option<i64>) -> String {
    match value {
        Some(ts) if ts != 0 => match DateTime::from_timestamp(ts, 0) {
            Some(utc) => utc
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            None => ts.to_string(),
        },
        _ => MISSING.to_string(),
    }
}

fn format_shape(shape: &[i64]) -> String {
    if shape.is_empty() {
        return MISSING.to_string();
    }
    shape
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(" × ")
}
