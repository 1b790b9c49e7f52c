//! OS signal handling.
//!
//! SIGINT and SIGTERM both mean "drain and exit". On non-unix targets only
//! Ctrl+C is observed.

use crate::lifecycle::Shutdown;

/// Wait for the first termination signal.
#[cfg(unix)]
pub async fn termination_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let name = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(name)
}

#[cfg(not(unix))]
pub async fn termination_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}

/// Trigger `shutdown` when a termination signal arrives.
pub fn spawn_signal_listener(shutdown: Shutdown) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match termination_signal().await {
            Ok(name) => {
                tracing::info!(signal = name, "Shutdown signal received");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handlers, shutting down");
            }
        }
        shutdown.trigger();
    })
}
