//! Operator commands
//!
//! Each command is a single backend call whose outcome is folded back into
//! the engine: success sets the status line and clears the error, failure sets
//! the error and leaves everything else alone. `start` and `apply_threshold`
//! follow up with a forced refresh; `stop` does not, the status line is enough
//! confirmation.

use tracing::info;

use crate::client::RemoteClient;
use crate::engine::SyncEngine;
use crate::error::ActionError;
use crate::models::WorkerStatus;

/// Runs operator commands against the engine's backend
pub struct ActionDispatcher<C: RemoteClient> {
    engine: SyncEngine<C>,
}

impl<C: RemoteClient> Clone for ActionDispatcher<C> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
        }
    }
}

impl<C: RemoteClient> ActionDispatcher<C> {
    pub fn new(engine: SyncEngine<C>) -> Self {
        Self { engine }
    }

    /// Start the worker, then refresh latest and events right away
    pub async fn start(&self) -> Result<WorkerStatus, ActionError> {
        match self.engine.client().start().await {
            Ok(status) => {
                info!("Worker start: {}", status.describe());
                self.engine
                    .record_status(format!("Start: {}", status.describe()))
                    .await;
                let _ = self.engine.refresh_all().await;
                Ok(status)
            }
            Err(e) => Err(self.fail(ActionError::Start(e)).await),
        }
    }

    /// Stop the worker
    pub async fn stop(&self) -> Result<WorkerStatus, ActionError> {
        match self.engine.client().stop().await {
            Ok(status) => {
                info!("Worker stop: {}", status.describe());
                self.engine
                    .record_status(format!("Stop: {}", status.describe()))
                    .await;
                Ok(status)
            }
            Err(e) => Err(self.fail(ActionError::Stop(e)).await),
        }
    }

    /// Send the threshold draft; on success refresh latest
    ///
    /// The reconciler is applied on a copy so the engine lock is released for
    /// the request. Only the confirmed value is written back, which keeps any
    /// edit made while the request was in flight.
    pub async fn apply_threshold(&self) -> Result<f64, ActionError> {
        let mut reconciler = self.engine.threshold().await;

        let confirmed = match reconciler.apply(self.engine.client()).await {
            Ok(confirmed) => confirmed,
            Err(e) => return Err(self.fail(ActionError::Settings(e)).await),
        };

        info!("Threshold confirmed at {:.3}", confirmed);
        self.engine
            .update(|state| {
                state.threshold.confirm(confirmed);
                state.status = Some(format!("Threshold updated to {:.3}", confirmed));
                state.error = None;
            })
            .await;

        let _ = self.engine.refresh_latest().await;
        Ok(confirmed)
    }

    /// Refresh latest and events outside the schedule
    pub async fn refresh(&self) -> Result<(), ActionError> {
        self.engine
            .refresh_all()
            .await
            .map_err(ActionError::Refresh)
    }

    async fn fail(&self, error: ActionError) -> ActionError {
        self.engine.record_error(error.to_string()).await;
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineSettings;
    use crate::error::{RemoteError, SettingsError, ValidationError};
    use crate::models::EventRecord;
    use crate::testing::{detection, status, FakeClient};
    use crate::view::Detection;

    fn dispatcher() -> (FakeClient, SyncEngine<FakeClient>, ActionDispatcher<FakeClient>) {
        let client = FakeClient::new();
        let engine = SyncEngine::new(client.clone(), EngineSettings::default());
        let dispatcher = ActionDispatcher::new(engine.clone());
        (client, engine, dispatcher)
    }

    #[tokio::test]
    async fn test_start_forces_refresh() {
        let (client, engine, dispatcher) = dispatcher();
        client.set_latest(Ok(detection("drone", 0.91, true, 0.5)));

        let result = dispatcher.start().await.unwrap();
        assert_eq!(result.describe(), "started");

        let calls = client.calls();
        assert_eq!(calls.start, 1);
        assert_eq!(calls.fetch_latest, 1);
        assert_eq!(calls.fetch_events, 1);

        let snapshot = engine.snapshot();
        let panel = snapshot.view.panel().unwrap();
        assert_eq!(panel.detection, Detection::Detected);
        assert_eq!(panel.confidence, "0.910");
        assert_eq!(snapshot.status.as_deref(), Some("Start: started"));
        assert!(snapshot.error.is_none());
    }

    #[tokio::test]
    async fn test_start_failure_is_tagged() {
        let (client, engine, dispatcher) = dispatcher();
        client.set_start_response(Err(RemoteError::from_response(500, "model not loaded")));

        let err = dispatcher.start().await.unwrap_err();
        assert!(matches!(err, ActionError::Start(_)));

        let snapshot = engine.snapshot();
        assert_eq!(
            snapshot.error.as_deref(),
            Some("Start failed: model not loaded")
        );
        // No refresh after a failed start
        assert_eq!(client.calls().fetch_latest, 0);
    }

    #[tokio::test]
    async fn test_start_twice_reports_backend_status() {
        let (client, engine, dispatcher) = dispatcher();
        dispatcher.start().await.unwrap();

        client.set_start_response(Ok(status("already running")));
        dispatcher.start().await.unwrap();

        assert_eq!(client.calls().start, 2);
        assert_eq!(
            engine.snapshot().status.as_deref(),
            Some("Start: already running")
        );
    }

    #[tokio::test]
    async fn test_stop_does_not_refresh() {
        let (client, engine, dispatcher) = dispatcher();

        dispatcher.stop().await.unwrap();
        dispatcher.stop().await.unwrap();

        let calls = client.calls();
        assert_eq!(calls.stop, 2);
        assert_eq!(calls.fetch_latest, 0);
        assert_eq!(calls.fetch_events, 0);
        assert_eq!(engine.snapshot().status.as_deref(), Some("Stop: stopping"));
    }

    #[tokio::test]
    async fn test_stop_failure() {
        let (client, engine, dispatcher) = dispatcher();
        client.set_stop_response(Err(RemoteError::Transport("connection refused".into())));

        assert!(dispatcher.stop().await.is_err());
        assert_eq!(
            engine.snapshot().error.as_deref(),
            Some("Stop failed: connection refused")
        );
    }

    #[tokio::test]
    async fn test_apply_threshold_confirms_and_refreshes_latest() {
        let (client, engine, dispatcher) = dispatcher();
        engine.edit_threshold(0.7).await;

        let confirmed = dispatcher.apply_threshold().await.unwrap();
        assert_eq!(confirmed, 0.7);
        assert_eq!(client.applied(), vec![0.7]);

        let calls = client.calls();
        assert_eq!(calls.fetch_latest, 1);
        assert_eq!(calls.fetch_events, 0);

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.confirmed, Some(0.7));
        assert_eq!(snapshot.draft, 0.7);
        assert_eq!(
            snapshot.status.as_deref(),
            Some("Threshold updated to 0.700")
        );

        // A result that omits the threshold falls back to the confirmed one
        let mut latest = detection("DJI", 0.9, true, 0.0);
        latest.threshold = None;
        client.set_latest(Ok(latest));
        engine.tick().await;
        assert_eq!(
            engine.snapshot().view.panel().map(|p| p.threshold.as_str()),
            Some("0.700")
        );
    }

    #[tokio::test]
    async fn test_apply_invalid_threshold_is_not_sent() {
        let (client, engine, dispatcher) = dispatcher();
        client.set_latest(Ok(detection("DJI", 0.9, true, 0.85)));
        engine.tick().await;

        engine.edit_threshold(f64::NAN).await;
        let err = dispatcher.apply_threshold().await.unwrap_err();
        assert_eq!(
            err,
            ActionError::Settings(SettingsError::Validation(ValidationError::NotFinite))
        );

        engine.edit_threshold(1.5).await;
        assert!(dispatcher.apply_threshold().await.is_err());

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.confirmed, Some(0.85));
        assert!(snapshot
            .error
            .as_deref()
            .unwrap()
            .starts_with("Settings failed: Threshold must be between 0 and 1"));
        assert_eq!(client.calls().apply_setting, 0);
    }

    #[tokio::test]
    async fn test_apply_remote_failure_keeps_state() {
        let (client, engine, dispatcher) = dispatcher();
        client.set_latest(Ok(detection("DJI", 0.9, true, 0.85)));
        engine.tick().await;
        client.set_apply_response(Err(RemoteError::from_response(
            422,
            r#"{"detail":"threshold rejected"}"#,
        )));

        engine.edit_threshold(0.3).await;
        assert!(dispatcher.apply_threshold().await.is_err());

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.draft, 0.3);
        assert_eq!(snapshot.confirmed, Some(0.85));
        assert_eq!(
            snapshot.error.as_deref(),
            Some("Settings failed: threshold rejected")
        );
    }

    #[tokio::test]
    async fn test_refresh_reports_first_error() {
        let (client, engine, dispatcher) = dispatcher();
        client.set_events(Err(RemoteError::from_response(
            409,
            r#"{"detail":"worker not running"}"#,
        )));

        let err = dispatcher.refresh().await.unwrap_err();
        assert_eq!(err.to_string(), "worker not running");
        assert_eq!(
            engine.snapshot().error.as_deref(),
            Some("worker not running")
        );
    }

    #[tokio::test]
    async fn test_refresh_publishes_once() {
        let (client, engine, dispatcher) = dispatcher();
        client.set_latest(Ok(detection("DJI", 0.9, true, 0.85)));
        client.set_events(Ok(vec![EventRecord::default()]));

        let mut rx = engine.subscribe();
        dispatcher.refresh().await.unwrap();
        let snapshot = rx.borrow_and_update().clone();
        assert!(snapshot.view.panel().is_some());
        assert_eq!(snapshot.view.events.len(), 1);

        dispatcher.refresh().await.unwrap();
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_success_clears_previous_error() {
        let (client, engine, dispatcher) = dispatcher();
        client.set_stop_response(Err(RemoteError::Transport("connection refused".into())));
        assert!(dispatcher.stop().await.is_err());

        client.set_stop_response(Ok(status("already stopped")));
        dispatcher.stop().await.unwrap();

        let snapshot = engine.snapshot();
        assert!(snapshot.error.is_none());
        assert_eq!(snapshot.status.as_deref(), Some("Stop: already stopped"));
    }
}
