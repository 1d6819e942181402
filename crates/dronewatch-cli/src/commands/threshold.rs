//! Detection threshold handlers

use anyhow::{Context, Result};

use dronewatch_core::view::format_confidence;
use dronewatch_core::{HttpRemoteClient, Monitor};

use crate::output::{Output, OutputFormat};

/// Show the threshold the backend currently enforces
pub async fn show(monitor: &Monitor<HttpRemoteClient>, output: &Output) -> Result<()> {
    monitor
        .engine()
        .refresh_latest()
        .await
        .context("Failed to fetch latest result")?;

    let confirmed = monitor.snapshot().confirmed;
    match output.format {
        OutputFormat::Json => {
            println!("{}", serde_json::json!({ "threshold": confirmed }));
        }
        OutputFormat::Quiet => println!("{}", format_confidence(confirmed)),
        OutputFormat::Human => match confirmed {
            Some(_) => println!("Threshold: {}", format_confidence(confirmed)),
            None => println!("Threshold: not reported yet (worker has not run)"),
        },
    }
    Ok(())
}

/// Validate and apply a new threshold
pub async fn apply(
    monitor: &Monitor<HttpRemoteClient>,
    value: f64,
    output: &Output,
) -> Result<()> {
    monitor.edit_threshold(value).await;
    let confirmed = monitor.dispatcher().apply_threshold().await?;

    output.success(&format!("Threshold updated to {:.3}", confirmed));
    Ok(())
}
