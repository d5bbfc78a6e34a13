use std::sync::Arc;

use tokio::sync::watch::{self, Receiver, Sender};

/// Broadcasts a stop request to every listener created from it.
///
/// The signal is sticky: once [ShutdownHandle::shutdown] has been called, every existing and
/// future listener will report that the run should stop.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: Arc<Sender<bool>>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self {
            sender: Arc::new(watch::channel(false).0),
        }
    }

    pub fn shutdown(&self) {
        let already_stopped = self.sender.send_replace(true);
        if already_stopped {
            log::trace!("Shutdown requested more than once");
        }
    }

    pub fn is_shutdown(&self) -> bool {
        *self.sender.borrow()
    }

    pub fn new_listener(&self) -> DelegatedShutdownListener {
        DelegatedShutdownListener::new(self.sender.subscribe())
    }
}

#[derive(Clone, Debug)]
pub struct DelegatedShutdownListener {
    receiver: Receiver<bool>,
}

impl DelegatedShutdownListener {
    pub(crate) fn new(receiver: Receiver<bool>) -> Self {
        Self { receiver }
    }

    /// Point in time check if the shutdown signal has been sent. If this returns true then no new
    /// work should be started so that the run can wind down.
    pub fn should_shutdown(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Wait for the shutdown signal. It is safe to race this with another future so that the
    /// signal can be used to stop background work such as timers.
    ///
    /// Returns immediately if the signal was already sent, or if every [ShutdownHandle] has been
    /// dropped.
    pub async fn wait_for_shutdown(&mut self) {
        if self.receiver.wait_for(|stopped| *stopped).await.is_err() {
            log::trace!("Shutdown handle dropped while waiting for shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_not_shutdown_before_signal() {
        let handle = ShutdownHandle::new();
        let listener = handle.new_listener();

        assert!(!listener.should_shutdown());
        assert!(!handle.is_shutdown());
    }

    #[test]
    fn test_should_keep_reporting_shutdown_once_signalled() {
        let handle = ShutdownHandle::new();
        let listener = handle.new_listener();

        handle.shutdown();

        assert!(listener.should_shutdown());
        assert!(listener.should_shutdown());
        assert!(handle.new_listener().should_shutdown());
    }

    #[tokio::test]
    async fn test_should_wake_waiting_listener() {
        let handle = ShutdownHandle::new();
        let mut listener = handle.new_listener();

        let waiter = tokio::spawn(async move {
            listener.wait_for_shutdown().await;
        });

        handle.shutdown();
        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("listener was not woken")
            .unwrap();
    }
}
