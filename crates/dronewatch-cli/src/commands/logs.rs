//! Backend log tail handler

use anyhow::{Context, Result};

use dronewatch_core::{HttpRemoteClient, RemoteClient};

use crate::output::Output;

/// Show the last `lines` lines of the backend log (10 to 500)
pub async fn tail(client: &HttpRemoteClient, lines: u32, output: &Output) -> Result<()> {
    let logs = client
        .fetch_logs(lines)
        .await
        .context("Failed to fetch backend logs")?;

    output.print_logs(&logs);
    Ok(())
}
