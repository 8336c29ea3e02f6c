//! # Journey cancellation sources.
//!
//! The runner's only stop channel is its [`CancellationToken`]. These helpers
//! wire the usual triggers to it:
//! - [`cancel_on_signal`]: SIGINT/SIGTERM/SIGQUIT (Ctrl-C on other platforms)
//! - [`cancel_after`]: a journey-wide deadline
//!
//! Both return the helper's [`JoinHandle`]; aborting it disarms the trigger.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Waits for a termination signal.
///
/// Each call creates independent signal listeners.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

/// Waits for a termination signal.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Cancels `token` on the first termination signal.
pub fn cancel_on_signal(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            res = wait_for_shutdown_signal() => match res {
                Ok(()) => {
                    info!("termination signal received, cancelling journey");
                    token.cancel();
                }
                Err(e) => warn!(error = %e, "signal handlers unavailable"),
            },
        }
    })
}

/// Cancels `token` once `deadline` has elapsed.
pub fn cancel_after(token: CancellationToken, deadline: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = tokio::time::sleep(deadline) => {
                info!(?deadline, "journey deadline reached");
                token.cancel();
            }
        }
    })
}
