//! Process shutdown signalling over a `watch` channel.
//!
//! `true` means stop. A dropped sender also counts as stop, since nothing
//! can ever clear it again.

use tokio::sync::watch;
use tracing::{info, warn};

/// Resolve once shutdown has been signalled or can no longer be signalled.
pub async fn signaled(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Shutdown receiver that flips to `true` on Ctrl-C.
///
/// Must be called from within a tokio runtime.
pub fn on_ctrl_c() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown requested"),
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C; shutting down"),
        }
        let _ = tx.send(true);
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signaled_on_true() {
        let (tx, mut rx) = watch::channel(false);
        tx.send(true).unwrap();
        signaled(&mut rx).await;
    }

    #[tokio::test]
    async fn test_signaled_when_sender_dropped() {
        let (tx, mut rx) = watch::channel(false);
        drop(tx);
        signaled(&mut rx).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_signaled_while_false() {
        let (_tx, mut rx) = watch::channel(false);
        let waited =
            tokio::time::timeout(std::time::Duration::from_secs(1), signaled(&mut rx)).await;
        assert!(waited.is_err());
    }
}
