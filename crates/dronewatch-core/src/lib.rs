//! dronewatch core library
//!
//! Keeps a terminal dashboard in sync with a remote RF drone-detection
//! backend: polls the backend's latest result and recent events, reconciles
//! an operator-edited detection threshold against the value the backend
//! confirms, and turns raw payloads into display-ready strings.
//!
//! # Architecture
//!
//! - **SyncEngine**: single source of truth; publishes a `Snapshot` on a
//!   watch channel whenever something visible changes
//! - **PollScheduler**: one repeating timer, restarted when the poll config
//!   changes
//! - **ActionDispatcher**: start/stop/apply-threshold/refresh commands
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let client = HttpRemoteClient::new(&config.api_url);
//! let mut monitor = Monitor::new(client, config.engine_settings());
//! monitor.start_polling().await;
//!
//! let mut rx = monitor.subscribe();
//! while rx.changed().await.is_ok() {
//!     render(&rx.borrow_and_update());
//! }
//! ```
//!
//! # Modules
//!
//! - `client`: HTTP access to the backend
//! - `models`: wire types and the poll config
//! - `reconciler`: threshold draft vs. confirmed
//! - `scheduler`: the poll timer
//! - `view`: projection into display strings
//! - `engine`: shared state and snapshots
//! - `dispatcher`: operator commands
//! - `monitor`: everything above wired together
//! - `config`: application configuration

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod models;
pub mod monitor;
pub mod reconciler;
pub mod scheduler;
pub mod view;

#[cfg(test)]
mod testing;

pub use client::{HttpRemoteClient, RemoteClient, DEFAULT_API_URL};
pub use config::Config;
pub use dispatcher::ActionDispatcher;
pub use engine::{EngineSettings, Snapshot, SyncEngine};
pub use error::{ActionError, RemoteError, SettingsError, ValidationError};
pub use models::{EventRecord, LatestResult, LatestStatus, LogTail, PollConfig, WorkerStatus};
pub use monitor::Monitor;
pub use reconciler::SettingReconciler;
pub use scheduler::PollScheduler;
pub use view::{Detection, EmptyReason, LatestPanel, LatestView, ViewModel};
