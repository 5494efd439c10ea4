//! Trailing-edge debouncing on the tokio runtime.
//!
//! A [`Debouncer`] coalesces a burst of calls into one invocation that runs
//! once the burst has been quiet for the configured window. Calls replaced
//! before their window elapses are dropped, never queued.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Cancellable trailing-edge timer.
///
/// Must be used from within a tokio runtime.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    /// Bumped by every call and by cancellation; a scheduled call only fires
    /// if the generation it captured is still current.
    generation: Arc<AtomicU64>,
}

impl Debouncer {
    /// Create a debouncer with the given coalescing window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Coalescing window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Schedule `task`, superseding any call that has not fired yet.
    ///
    /// Outside a tokio runtime the call is dropped.
    pub fn call<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = Arc::clone(&self.generation);
        let window = self.window;

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("debounced call dropped, no tokio runtime");
            return;
        };
        runtime.spawn(async move {
            tokio::time::sleep(window).await;
            if generation.load(Ordering::SeqCst) == ticket {
                task.await;
            } else {
                tracing::trace!(ticket, "debounced call superseded");
            }
        });
    }

    /// Drop the pending call, if any.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
