//! In-memory backend for tests
//!
//! Scripted responses plus call counters. Clones share state, so a test can
//! keep a handle while the engine owns another.

use std::sync::{Arc, Mutex};

use crate::client::RemoteClient;
use crate::error::RemoteError;
use crate::models::{EventRecord, LatestResult, LogTail, WorkerStatus};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallCounts {
    pub fetch_latest: usize,
    pub fetch_events: usize,
    pub start: usize,
    pub stop: usize,
    pub apply_setting: usize,
}

struct FakeState {
    latest: Result<LatestResult, RemoteError>,
    events: Result<Vec<EventRecord>, RemoteError>,
    start: Result<WorkerStatus, RemoteError>,
    stop: Result<WorkerStatus, RemoteError>,
    /// `None` echoes the requested value
    apply: Option<Result<f64, RemoteError>>,
    calls: CallCounts,
    applied: Vec<f64>,
    event_limits: Vec<u32>,
}

#[derive(Clone)]
pub struct FakeClient {
    state: Arc<Mutex<FakeState>>,
}

impl FakeClient {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                latest: Ok(LatestResult::no_data()),
                events: Ok(Vec::new()),
                start: Ok(status("started")),
                stop: Ok(status("stopping")),
                apply: None,
                calls: CallCounts::default(),
                applied: Vec::new(),
                event_limits: Vec::new(),
            })),
        }
    }

    pub fn set_latest(&self, latest: Result<LatestResult, RemoteError>) {
        self.state.lock().unwrap().latest = latest;
    }

    pub fn set_events(&self, events: Result<Vec<EventRecord>, RemoteError>) {
        self.state.lock().unwrap().events = events;
    }

    pub fn set_start_response(&self, response: Result<WorkerStatus, RemoteError>) {
        self.state.lock().unwrap().start = response;
    }

    pub fn set_stop_response(&self, response: Result<WorkerStatus, RemoteError>) {
        self.state.lock().unwrap().stop = response;
    }

    pub fn set_apply_response(&self, response: Result<f64, RemoteError>) {
        self.state.lock().unwrap().apply = Some(response);
    }

    pub fn calls(&self) -> CallCounts {
        self.state.lock().unwrap().calls
    }

    /// Values sent to `/settings`, in order
    pub fn applied(&self) -> Vec<f64> {
        self.state.lock().unwrap().applied.clone()
    }

    /// `limit` of every `/events` request, in order
    pub fn event_limits(&self) -> Vec<u32> {
        self.state.lock().unwrap().event_limits.clone()
    }
}

pub fn status(text: &str) -> WorkerStatus {
    WorkerStatus {
        status: Some(text.to_string()),
    }
}

/// A populated result as the backend would send it
pub fn detection(label: &str, confidence: f64, detected: bool, threshold: f64) -> LatestResult {
    LatestResult {
        label: Some(label.to_string()),
        predicted_class: Some(0),
        confidence: Some(confidence),
        detected,
        latency_ms: Some(12.5),
        timestamp: Some(1_718_000_000),
        input_shape: vec![1, 2, 1024, 1024],
        threshold: Some(threshold),
        ..LatestResult::default()
    }
}

impl RemoteClient for FakeClient {
    async fn fetch_latest(&self) -> Result<LatestResult, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.fetch_latest += 1;
        state.latest.clone()
    }

    async fn fetch_events(&self, limit: u32) -> Result<Vec<EventRecord>, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.fetch_events += 1;
        state.event_limits.push(limit);
        state
            .events
            .clone()
            .map(|events| events.into_iter().take(limit as usize).collect())
    }

    async fn start(&self) -> Result<WorkerStatus, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.start += 1;
        state.start.clone()
    }

    async fn stop(&self) -> Result<WorkerStatus, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.stop += 1;
        state.stop.clone()
    }

    async fn apply_setting(&self, threshold: f64) -> Result<f64, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.apply_setting += 1;
        state.applied.push(threshold);
        state.apply.clone().unwrap_or(Ok(threshold))
    }

    async fn fetch_logs(&self, _lines: u32) -> Result<LogTail, RemoteError> {
        Ok(LogTail::default())
    }
}
