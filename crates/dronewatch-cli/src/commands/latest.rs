//! Latest result and event history handlers

use anyhow::{Context, Result};

use dronewatch_core::{HttpRemoteClient, PollConfig, RemoteClient};

use crate::output::Output;

/// Show the most recent detection result
pub async fn show(client: &HttpRemoteClient, output: &Output) -> Result<()> {
    let latest = client
        .fetch_latest()
        .await
        .context("Failed to fetch latest result")?;

    output.print_latest(&latest);
    Ok(())
}

/// List recent events
pub async fn events(client: &HttpRemoteClient, limit: u32, output: &Output) -> Result<()> {
    // Same clamp the poll cycle applies
    let limit = PollConfig::default().with_events_limit(limit).events_limit();

    let events = client
        .fetch_events(limit)
        .await
        .context("Failed to fetch events")?;

    output.print_events(&events);
    Ok(())
}
