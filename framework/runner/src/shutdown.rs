use stampede_core::prelude::{DelegatedShutdownListener, ShutdownHandle};
use tokio::signal;

/// Request a shutdown through the run's own `handle` when the process receives Ctrl-C, or when
/// the caller's handle is triggered. The caller's handle is only listened to, never triggered.
pub(crate) fn start_shutdown_listener(
    runtime: &tokio::runtime::Runtime,
    handle: ShutdownHandle,
    caller_listener: Option<DelegatedShutdownListener>,
) {
    let mut shutdown_listener = handle.new_listener();
    runtime.spawn(async move {
        let caller_stop = async move {
            if let Some(mut listener) = caller_listener {
                listener.wait_for_shutdown().await;
                if listener.should_shutdown() {
                    return;
                }
            }
            // No caller handle, or it was dropped without being triggered.
            std::future::pending::<()>().await
        };

        tokio::select! {
            result = signal::ctrl_c() => {
                match result {
                    Ok(()) => {
                        println!("Received shutdown signal, shutting down...");
                        handle.shutdown();
                    }
                    Err(e) => log::warn!("Failed to listen for Ctrl-C, the run can only be stopped by its deadline: {e}"),
                }
            }
            _ = caller_stop => {
                log::debug!("Stop requested by the caller's shutdown handle");
                handle.shutdown();
            }
            _ = shutdown_listener.wait_for_shutdown() => {
                log::trace!("Run stopped, no longer listening for Ctrl-C");
            }
        }
    });
}
