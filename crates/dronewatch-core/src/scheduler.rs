//! Poll scheduler
//!
//! One repeating timer running in a single tokio task. Ticks are serialized:
//! the task awaits each tick before waiting on the next interval, so ticks
//! never overlap each other.
//!
//! Reconfiguring is cancel-then-create: the old task is signalled and awaited
//! (an in-flight tick is allowed to finish) before the new one is spawned, so
//! two timers are never alive at once. After [`PollScheduler::stop`] returns
//! the tick callback is never invoked again.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::models::{PollConfig, MIN_POLL_INTERVAL};

/// Callback invoked on every tick
pub type TickFn = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

struct RunningTimer {
    cancel_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Drives periodic refreshes
#[derive(Default)]
pub struct PollScheduler {
    on_tick: Option<TickFn>,
    config: Option<PollConfig>,
    running: Option<RunningTimer>,
}

impl PollScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start ticking: once immediately, then every `config.interval()`
    ///
    /// Replaces any timer already running.
    pub async fn start<F, Fut>(&mut self, config: PollConfig, on_tick: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let on_tick: TickFn = Arc::new(move || on_tick().boxed());
        self.stop().await;
        self.on_tick = Some(on_tick);
        self.spawn(config);
    }

    /// Restart the timer with a new config, keeping the same callback
    ///
    /// The new cycle ticks immediately. If the scheduler was never started the
    /// config is only recorded.
    pub async fn reconfigure(&mut self, config: PollConfig) {
        self.stop().await;
        if self.on_tick.is_some() {
            info!(
                "Poll reconfigured: interval={:?}, events_limit={}",
                config.interval(),
                config.events_limit()
            );
            self.spawn(config);
        } else {
            self.config = Some(config);
        }
    }

    /// Cancel the timer and wait for any in-flight tick to finish
    ///
    /// Safe to call when already stopped.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        let _ = running.cancel_tx.send(true);
        if let Err(e) = running.handle.await {
            if e.is_panic() {
                warn!("Poll task panicked: {}", e);
            }
        }
        debug!("Poll timer stopped");
    }

    /// Whether a timer task is alive
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Config of the current (or last) cycle
    pub fn config(&self) -> Option<PollConfig> {
        self.config
    }

    fn spawn(&mut self, config: PollConfig) {
        let Some(on_tick) = self.on_tick.clone() else {
            return;
        };

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let interval = config.interval().max(MIN_POLL_INTERVAL);
        let handle = tokio::spawn(timer_loop(interval, on_tick, cancel_rx));

        self.config = Some(config);
        self.running = Some(RunningTimer { cancel_tx, handle });
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        // The task exits after its current tick
        if let Some(running) = self.running.take() {
            let _ = running.cancel_tx.send(true);
        }
    }
}

async fn timer_loop(interval: Duration, on_tick: TickFn, mut cancel_rx: watch::Receiver<bool>) {
    debug!("Poll timer started, interval={:?}", interval);

    // First tick completes immediately
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = cancel_rx.changed() => break,

            _ = ticker.tick() => {
                if *cancel_rx.borrow() {
                    break;
                }
                on_tick().await;
            }
        }
    }
}
