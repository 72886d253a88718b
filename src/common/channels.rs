//! Stop-signal channel shared between the entry point and the control loop

use tokio::sync::watch;

/// Sender half used to request a stop
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: std::sync::Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    /// Request the loop to stop after the current cycle
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }
}

/// Receiver half polled by the loop between cycles
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once a stop has been requested (or the handle dropped)
    pub async fn triggered(&mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Create a new stop-signal pair
pub fn create_shutdown_channel() -> (ShutdownHandle, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (
        ShutdownHandle {
            tx: std::sync::Arc::new(tx),
        },
        ShutdownSignal { rx },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_is_observed() {
        let (handle, mut signal) = create_shutdown_channel();
        assert!(!signal.is_triggered());

        handle.trigger();
        assert!(signal.is_triggered());
        tokio::time::timeout(Duration::from_secs(1), signal.triggered())
            .await
            .expect("signal should resolve");
    }

    #[tokio::test]
    async fn test_dropped_handle_releases_waiters() {
        let (handle, mut signal) = create_shutdown_channel();
        drop(handle);
        tokio::time::timeout(Duration::from_secs(1), signal.triggered())
            .await
            .expect("dropping the handle should release the waiter");
    }
}
