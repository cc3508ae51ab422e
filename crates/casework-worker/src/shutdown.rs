// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stop signal for `casework worker`.
//!
//! SIGTERM or SIGINT cancels the token passed to [`crate::WorkerLoop::run`].
//! The loop checks it between ticks, so the job in flight is finished or
//! requeued before the process exits.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Spawns the signal listener and returns the token the worker loop watches.
///
/// Must be called inside a Tokio runtime. The token is cancelled once; a
/// second signal while the last job finishes has no further effect.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            let mut sigterm =
                signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

            tokio::select! {
                _ = ctrl_c => {
                    info!("received SIGINT (Ctrl+C), stopping worker");
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, stopping worker");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, stopping worker");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn install_signal_handler_returns_token() {
        let token = install_signal_handler();
        assert!(!token.is_cancelled());
        token.cancel();
    }
}
