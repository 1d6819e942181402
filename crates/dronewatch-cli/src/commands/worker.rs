//! Worker start/stop handlers

use anyhow::Result;

use dronewatch_core::{HttpRemoteClient, Monitor};

use crate::output::Output;

/// Start the detection worker and show the first result
pub async fn start(monitor: &Monitor<HttpRemoteClient>, output: &Output) -> Result<()> {
    let status = monitor.dispatcher().start().await?;
    let snapshot = monitor.snapshot();

    // The snapshot already carries the start status
    if output.is_json() {
        output.print_snapshot(&snapshot);
        return Ok(());
    }

    output.success(&format!("Start: {}", status.describe()));
    if !output.is_quiet() {
        output.print_snapshot(&snapshot);
    }
    Ok(())
}

/// Stop the detection worker
pub async fn stop(monitor: &Monitor<HttpRemoteClient>, output: &Output) -> Result<()> {
    let status = monitor.dispatcher().stop().await?;
    output.success(&format!("Stop: {}", status.describe()));
    Ok(())
}
