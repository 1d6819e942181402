//! Command handlers

pub mod config;
pub mod latest;
pub mod logs;
pub mod threshold;
pub mod watch;
pub mod worker;

use dronewatch_core::{Config, HttpRemoteClient, Monitor};

/// Client for the configured backend
pub fn client(config: &Config) -> HttpRemoteClient {
    HttpRemoteClient::new(&config.api_url)
}

/// Engine, scheduler and dispatcher for the configured backend (not polling)
pub fn monitor(config: &Config) -> Monitor<HttpRemoteClient> {
    Monitor::new(client(config), config.engine_settings())
}
