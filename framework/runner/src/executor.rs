use std::future::Future;

/// Wraps the shared Tokio runtime that every virtual user blocks on for network waits.
#[derive(Debug)]
pub struct Executor {
    runtime: tokio::runtime::Runtime,
}

impl Executor {
    pub(crate) fn new(runtime: tokio::runtime::Runtime) -> Self {
        Self { runtime }
    }

    /// Run async code in place, blocking the calling thread until it completes.
    ///
    /// The future is never cancelled by a shutdown request. Anything that needs a hard limit,
    /// such as a request timeout, must apply it inside the future.
    pub fn execute_in_place<T>(&self, fut: impl Future<Output = T>) -> T {
        self.runtime.block_on(fut)
    }
}
