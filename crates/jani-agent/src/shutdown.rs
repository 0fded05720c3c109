// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signal handling and background-task draining.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::session::ChatOrchestrator;

/// Returns a token cancelled on SIGINT (Ctrl+C) or SIGTERM.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT (Ctrl+C), cancelling"),
                        _ = sigterm.recv() => info!("received SIGTERM, cancelling"),
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to install SIGTERM handler");
                    let _ = ctrl_c.await;
                    info!("received SIGINT (Ctrl+C), cancelling");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, cancelling");
        }

        token_clone.cancel();
        debug!("signal handler completed");
    });

    token
}

/// Waits up to `timeout` for the orchestrator's background tasks.
///
/// Returns `true` when everything finished in time.
pub async fn drain_background(orchestrator: &ChatOrchestrator, timeout: Duration) -> bool {
    let pending = orchestrator.background_tasks();
    if pending == 0 {
        return true;
    }
    info!(pending, timeout_secs = timeout.as_secs(), "draining background tasks");
    match tokio::time::timeout(timeout, orchestrator.wait_for_background()).await {
        Ok(()) => true,
        Err(_) => {
            warn!(pending = orchestrator.background_tasks(), "background tasks still running after timeout");
            false
        }
    }
}
