//! Monitor: the engine, its poll scheduler and the command dispatcher wired
//! together
//!
//! This is what frontends hold. Poll config edits go through here so the
//! engine's copy and the running timer never disagree.

use std::time::Duration;

use tokio::sync::watch;
use tracing::info;

use crate::client::RemoteClient;
use crate::dispatcher::ActionDispatcher;
use crate::engine::{EngineSettings, Snapshot, SyncEngine};
use crate::models::PollConfig;
use crate::scheduler::PollScheduler;

pub struct Monitor<C: RemoteClient> {
    engine: SyncEngine<C>,
    dispatcher: ActionDispatcher<C>,
    scheduler: PollScheduler,
}

impl<C: RemoteClient> Monitor<C> {
    pub fn new(client: C, settings: EngineSettings) -> Self {
        let engine = SyncEngine::new(client, settings);
        let dispatcher = ActionDispatcher::new(engine.clone());

        Self {
            engine,
            dispatcher,
            scheduler: PollScheduler::new(),
        }
    }

    /// Begin scheduled refreshes with the engine's current poll config
    pub async fn start_polling(&mut self) {
        let config = self.engine.poll_config().await;
        let engine = self.engine.clone();

        info!(
            "Polling every {:?}, events_limit={}",
            config.interval(),
            config.events_limit()
        );
        self.scheduler
            .start(config, move || {
                let engine = engine.clone();
                async move { engine.tick().await }
            })
            .await;
    }

    /// Replace the poll config, restarting the timer if it changed
    pub async fn set_poll_config(&mut self, config: PollConfig) {
        if self.engine.set_poll_config(config).await {
            self.scheduler.reconfigure(config).await;
        }
    }

    pub async fn set_poll_interval(&mut self, interval: Duration) {
        let config = self.engine.poll_config().await.with_interval(interval);
        self.set_poll_config(config).await;
    }

    pub async fn set_events_limit(&mut self, events_limit: u32) {
        let config = self
            .engine
            .poll_config()
            .await
            .with_events_limit(events_limit);
        self.set_poll_config(config).await;
    }

    pub async fn edit_threshold(&self, value: f64) {
        self.engine.edit_threshold(value).await;
    }

    pub async fn nudge_threshold(&self, delta: f64) {
        self.engine.nudge_threshold(delta).await;
    }

    pub fn engine(&self) -> &SyncEngine<C> {
        &self.engine
    }

    /// Cheap handle for running commands off the UI task
    pub fn dispatcher(&self) -> ActionDispatcher<C> {
        self.dispatcher.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.engine.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.engine.snapshot()
    }

    pub fn is_polling(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Stop polling; waits for an in-flight tick
    pub async fn shutdown(&mut self) {
        self.scheduler.stop().await;
    }
}
