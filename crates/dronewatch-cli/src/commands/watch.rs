//! Line-by-line dashboard without a terminal UI

use anyhow::Result;
use tracing::info;

use dronewatch_core::{HttpRemoteClient, Monitor};

use crate::output::Output;

/// Poll on schedule and print every snapshot that changed, until Ctrl-C
pub async fn run(mut monitor: Monitor<HttpRemoteClient>, output: &Output) -> Result<()> {
    let mut rx = monitor.subscribe();
    monitor.start_polling().await;

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = rx.borrow_and_update().clone();
                output.print_snapshot(&snapshot);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping watch");
                break;
            }
        }
    }

    monitor.shutdown().await;
    Ok(())
}
