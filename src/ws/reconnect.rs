//! Serialization of reconnect attempts.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use backoff::backoff::{Backoff as _, Constant};
use tokio::time::sleep;

/// Guard ensuring at most one reconnect attempt is pending at a time.
///
/// The pending flag is taken when an attempt is scheduled and released
/// immediately before the attempt runs, so a failure during the attempt can
/// schedule the next one.
pub(crate) struct ReconnectGuard {
    delay: Duration,
    pending: Arc<AtomicBool>,
}

impl ReconnectGuard {
    pub(crate) fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Schedule `attempt` to run after the fixed delay.
    ///
    /// Returns `false` without scheduling when an attempt is already pending.
    pub(crate) fn schedule<F, Fut>(&self, attempt: F) -> bool
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        if self.pending.swap(true, Ordering::SeqCst) {
            return false;
        }

        let pending = Arc::clone(&self.pending);
        let mut policy = Constant::new(self.delay);
        tokio::spawn(async move {
            if let Some(delay) = policy.next_backoff() {
                sleep(delay).await;
            }
            pending.store(false, Ordering::SeqCst);
            attempt().await;
        });

        true
    }

    /// Drop the pending flag unconditionally.
    ///
    /// Explicit teardown calls this even when nothing is pending, so a manual
    /// connect that follows is never refused.
    pub(crate) fn release(&self) {
        self.pending.store(false, Ordering::SeqCst);
    }

    #[cfg(test)]
    pub(crate) fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }
}
