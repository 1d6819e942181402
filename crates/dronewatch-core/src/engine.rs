//! Synchronization engine
//!
//! [`SyncEngine`] is the single source of truth for everything the dashboard
//! shows: the latest result, the events window, the threshold reconciler, the
//! poll config, and the status/error messages. State lives behind one mutex
//! that is only ever held for in-memory updates, never across a network call.
//!
//! Every update publishes an immutable [`Snapshot`] on a watch channel, but
//! only if it differs from the previous one, so a renderer that waits on the
//! channel redraws exactly when something visible changed.
//!
//! Two overlapping refreshes of the same resource (a scheduled tick and a
//! forced refresh after a command) are not cancelled; whichever answer lands
//! last wins. Each answer is a complete snapshot of its resource.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};

use crate::client::RemoteClient;
use crate::error::RemoteError;
use crate::models::{EventRecord, LatestResult, PollConfig};
use crate::reconciler::SettingReconciler;
use crate::view::{project, ViewModel};

/// Default threshold draft before the backend has reported one
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Initial engine parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    pub default_threshold: f64,
    pub poll: PollConfig,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_threshold: DEFAULT_THRESHOLD,
            poll: PollConfig::default(),
        }
    }
}

/// Immutable copy of the view-producing state
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub view: ViewModel,
    /// Threshold being edited
    pub draft: f64,
    /// Threshold the backend last acknowledged
    pub confirmed: Option<f64>,
    pub poll: PollConfig,
    /// Outcome of the last command
    pub status: Option<String>,
    /// Current error, cleared by the next success
    pub error: Option<String>,
}

pub(crate) struct EngineState {
    latest: Option<LatestResult>,
    events: Vec<EventRecord>,
    pub(crate) threshold: SettingReconciler,
    poll: PollConfig,
    pub(crate) status: Option<String>,
    pub(crate) error: Option<String>,
}

impl EngineState {
    fn new(settings: EngineSettings) -> Self {
        Self {
            latest: None,
            events: Vec::new(),
            threshold: SettingReconciler::new(settings.default_threshold),
            poll: settings.poll,
            status: None,
            error: None,
        }
    }

    fn apply_latest(&mut self, latest: LatestResult) {
        if let Some(threshold) = latest.threshold {
            self.threshold.observe(threshold);
        }
        self.latest = Some(latest);
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            view: project(
                self.latest.as_ref(),
                self.threshold.confirmed(),
                &self.events,
            ),
            draft: self.threshold.draft(),
            confirmed: self.threshold.confirmed(),
            poll: self.poll,
            status: self.status.clone(),
            error: self.error.clone(),
        }
    }
}

/// State container plus the fetch operations that feed it
pub struct SyncEngine<C: RemoteClient> {
    client: Arc<C>,
    state: Arc<Mutex<EngineState>>,
    snapshot_tx: Arc<watch::Sender<Snapshot>>,
}

impl<C: RemoteClient> Clone for SyncEngine<C> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            state: self.state.clone(),
            snapshot_tx: self.snapshot_tx.clone(),
        }
    }
}

impl<C: RemoteClient> SyncEngine<C> {
    pub fn new(client: C, settings: EngineSettings) -> Self {
        let state = EngineState::new(settings);
        let (snapshot_tx, _) = watch::channel(state.snapshot());

        Self {
            client: Arc::new(client),
            state: Arc::new(Mutex::new(state)),
            snapshot_tx: Arc::new(snapshot_tx),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Receive every distinct snapshot from now on
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Most recently published snapshot
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// One scheduled refresh of latest and events
    ///
    /// Failures are recorded as the current error and never propagate, so the
    /// scheduler keeps running.
    pub async fn tick(&self) {
        let _ = self.refresh_all().await;
    }

    /// Fetch latest and events, then fold both into state in one update
    ///
    /// A steady outcome (say latest fine, events failing) publishes nothing
    /// new. The first failure, latest before events, becomes the current error
    /// and is returned.
    pub async fn refresh_all(&self) -> Result<(), RemoteError> {
        let latest = self.fetch_latest().await;
        let events = self.fetch_events().await;

        let mut failure = None;
        self.update(|state| {
            match latest {
                Ok(latest) => state.apply_latest(latest),
                Err(e) => failure = Some(e),
            }
            match events {
                Ok(events) => state.events = events,
                Err(e) => {
                    failure.get_or_insert(e);
                }
            }
            state.error = failure.as_ref().map(ToString::to_string);
        })
        .await;

        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Fetch `/latest` and fold it into state
    pub async fn refresh_latest(&self) -> Result<(), RemoteError> {
        match self.fetch_latest().await {
            Ok(latest) => {
                self.update(|state| {
                    state.apply_latest(latest);
                    state.error = None;
                })
                .await;
                Ok(())
            }
            Err(e) => {
                self.record_error(e.to_string()).await;
                Err(e)
            }
        }
    }

    async fn fetch_latest(&self) -> Result<LatestResult, RemoteError> {
        let result = self.client.fetch_latest().await;
        if let Err(ref e) = result {
            warn!("Failed to fetch latest result: {}", e);
        }
        result
    }

    /// Fetch `/events` with the configured limit
    async fn fetch_events(&self) -> Result<Vec<EventRecord>, RemoteError> {
        let limit = self.state.lock().await.poll.events_limit();

        match self.client.fetch_events(limit).await {
            Ok(events) => {
                debug!("Fetched {} events (limit {})", events.len(), limit);
                Ok(events)
            }
            Err(e) => {
                warn!("Failed to fetch events: {}", e);
                Err(e)
            }
        }
    }

    /// Replace the threshold draft with operator input
    pub async fn edit_threshold(&self, value: f64) {
        self.update(|state| state.threshold.edit(value)).await;
    }

    /// Move the draft by `delta`, clamped to `[0, 1]`
    ///
    /// A non-finite draft restarts from the confirmed value (or 0).
    pub async fn nudge_threshold(&self, delta: f64) {
        self.update(|state| {
            let base = if state.threshold.draft().is_finite() {
                state.threshold.draft()
            } else {
                state.threshold.confirmed().unwrap_or(0.0)
            };
            let nudged = ((base + delta) * 1000.0).round() / 1000.0;
            state.threshold.edit(nudged.clamp(0.0, 1.0));
        })
        .await;
    }

    /// Copy of the threshold reconciler
    pub async fn threshold(&self) -> SettingReconciler {
        self.state.lock().await.threshold.clone()
    }

    pub async fn poll_config(&self) -> PollConfig {
        self.state.lock().await.poll
    }

    /// Store a new poll config; returns whether it changed
    pub async fn set_poll_config(&self, config: PollConfig) -> bool {
        self.update(|state| {
            let changed = state.poll != config;
            state.poll = config;
            changed
        })
        .await
    }

    pub(crate) async fn record_status(&self, message: String) {
        self.update(|state| {
            state.status = Some(message);
            state.error = None;
        })
        .await;
    }

    pub(crate) async fn record_error(&self, message: String) {
        self.update(|state| state.error = Some(message)).await;
    }

    /// Apply an in-memory change and publish the resulting snapshot
    ///
    /// Publishing happens under the lock so snapshots go out in the same
    /// order the updates were made.
    pub(crate) async fn update<R>(&self, f: impl FnOnce(&mut EngineState) -> R) -> R {
        let mut state = self.state.lock().await;
        let result = f(&mut state);
        let snapshot = state.snapshot();

        self.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{detection, FakeClient};
    use crate::view::{Detection, EmptyReason};

    fn engine() -> (FakeClient, SyncEngine<FakeClient>) {
        let client = FakeClient::new();
        let engine = SyncEngine::new(client.clone(), EngineSettings::default());
        (client, engine)
    }

    #[tokio::test]
    async fn test_initial_snapshot_is_no_data() {
        let (_client, engine) = engine();
        let snapshot = engine.snapshot();

        assert_eq!(snapshot.view.empty_reason(), Some(EmptyReason::NoData));
        assert_eq!(snapshot.draft, DEFAULT_THRESHOLD);
        assert_eq!(snapshot.confirmed, None);
        assert!(snapshot.error.is_none());
    }

    #[tokio::test]
    async fn test_tick_with_no_data_shows_not_started() {
        let (client, engine) = engine();
        engine.tick().await;

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.view.empty_reason(), Some(EmptyReason::NotStarted));
        assert_eq!(client.calls().fetch_latest, 1);
        assert_eq!(client.event_limits(), vec![20]);
    }

    #[tokio::test]
    async fn test_first_poll_seeds_draft_only_once() {
        let (client, engine) = engine();

        client.set_latest(Ok(detection("DJI", 0.9, true, 0.85)));
        engine.tick().await;
        assert_eq!(engine.snapshot().draft, 0.85);

        client.set_latest(Ok(detection("DJI", 0.9, true, 0.6)));
        engine.tick().await;
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.draft, 0.85);
        assert_eq!(snapshot.confirmed, Some(0.6));
    }

    #[tokio::test]
    async fn test_poll_keeps_operator_edit() {
        let (client, engine) = engine();
        client.set_latest(Ok(detection("DJI", 0.9, true, 0.85)));
        engine.tick().await;

        engine.edit_threshold(0.42).await;
        engine.tick().await;
        engine.tick().await;

        assert_eq!(engine.snapshot().draft, 0.42);
    }

    #[tokio::test]
    async fn test_events_error_uses_detail() {
        let (client, engine) = engine();
        client.set_latest(Ok(detection("DJI", 0.9, true, 0.85)));
        client.set_events(Err(RemoteError::from_response(
            409,
            r#"{"detail":"worker not running"}"#,
        )));

        engine.tick().await;

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.error.as_deref(), Some("worker not running"));
        // Latest data stays visible next to the error
        assert_eq!(
            snapshot.view.panel().map(|p| p.detection),
            Some(Detection::Detected)
        );
    }

    #[tokio::test]
    async fn test_failed_tick_keeps_stale_data_and_recovers() {
        let (client, engine) = engine();
        client.set_latest(Ok(detection("DJI", 0.9, true, 0.85)));
        engine.tick().await;

        client.set_latest(Err(RemoteError::Transport("connection refused".into())));
        client.set_events(Err(RemoteError::Transport("connection refused".into())));
        engine.tick().await;

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.error.as_deref(), Some("connection refused"));
        assert_eq!(snapshot.view.panel().map(|p| p.label.as_str()), Some("DJI"));

        client.set_latest(Ok(detection("Taranis", 0.7, false, 0.85)));
        client.set_events(Ok(Vec::new()));
        engine.tick().await;

        let snapshot = engine.snapshot();
        assert!(snapshot.error.is_none());
        assert_eq!(
            snapshot.view.panel().map(|p| p.label.as_str()),
            Some("Taranis")
        );
    }

    #[tokio::test]
    async fn test_unchanged_poll_does_not_republish() {
        let (client, engine) = engine();
        client.set_latest(Ok(detection("DJI", 0.9, true, 0.85)));

        let mut rx = engine.subscribe();
        engine.tick().await;
        assert!(rx.has_changed().unwrap());
        let _ = rx.borrow_and_update();

        engine.tick().await;
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_steady_events_error_does_not_republish() {
        let (client, engine) = engine();
        client.set_latest(Ok(detection("DJI", 0.9, true, 0.85)));
        client.set_events(Err(RemoteError::from_response(
            409,
            r#"{"detail":"worker not running"}"#,
        )));

        let mut rx = engine.subscribe();
        engine.tick().await;
        assert_eq!(
            rx.borrow_and_update().error.as_deref(),
            Some("worker not running")
        );

        for _ in 0..3 {
            engine.tick().await;
            assert!(!rx.has_changed().unwrap());
        }
    }

    #[tokio::test]
    async fn test_refresh_all_reports_latest_failure_first() {
        let (client, engine) = engine();
        client.set_latest(Err(RemoteError::Transport("connection refused".into())));
        client.set_events(Err(RemoteError::from_response(500, "boom")));

        let err = engine.refresh_all().await.unwrap_err();
        assert_eq!(err.to_string(), "connection refused");
        assert_eq!(
            engine.snapshot().error.as_deref(),
            Some("connection refused")
        );

        // Events still land when only latest fails
        client.set_events(Ok(vec![EventRecord::default()]));
        assert!(engine.refresh_all().await.is_err());
        assert_eq!(engine.snapshot().view.events.len(), 1);
    }

    #[tokio::test]
    async fn test_events_use_configured_limit() {
        let (client, engine) = engine();
        let changed = engine
            .set_poll_config(PollConfig::default().with_events_limit(5))
            .await;
        assert!(changed);

        engine.tick().await;
        assert_eq!(client.event_limits(), vec![5]);

        let changed = engine
            .set_poll_config(PollConfig::default().with_events_limit(5))
            .await;
        assert!(!changed);
    }

    #[tokio::test]
    async fn test_nudge_threshold() {
        let (_client, engine) = engine();
        engine.nudge_threshold(0.01).await;
        assert_eq!(engine.snapshot().draft, 0.51);

        engine.edit_threshold(0.995).await;
        engine.nudge_threshold(0.01).await;
        assert_eq!(engine.snapshot().draft, 1.0);

        engine.edit_threshold(f64::NAN).await;
        engine.nudge_threshold(-0.01).await;
        assert_eq!(engine.snapshot().draft, 0.0);
    }
}
