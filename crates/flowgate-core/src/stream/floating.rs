//! Floating-request registry.
//!
//! Process-wide bookkeeping for requests currently in flight anywhere in
//! the graph, including floating branches that the caller path never
//! awaits. Graceful shutdown blocks on [`FlightTracker::wait_idle`] until
//! the registry drains.

use tokio::sync::watch;

/// Shared in-flight counter with a "wait until empty" primitive.
///
/// Cloning shares the same registry. Each tracked unit of work holds a
/// [`FlightGuard`]; the count drops when the guard does, so completion is
/// recorded even if the work panics or is cancelled.
#[derive(Debug, Clone)]
pub struct FlightTracker {
    tx: watch::Sender<usize>,
}

impl FlightTracker {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx }
    }

    /// Registers one unit of in-flight work.
    #[must_use]
    pub fn guard(&self) -> FlightGuard {
        self.tx.send_modify(|n| *n += 1);
        FlightGuard {
            tx: self.tx.clone(),
        }
    }

    /// Returns the number of units currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        *self.tx.borrow()
    }

    /// Resolves once the registry is empty.
    ///
    /// Returns immediately if nothing is in flight. Only waits for work
    /// registered before the call plus anything those units spawn while
    /// draining.
    pub async fn wait_idle(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so `wait_for` cannot observe a closed
        // channel here.
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

impl Default for FlightTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII registration of one in-flight unit of work.
#[derive(Debug)]
pub struct FlightGuard {
    tx: watch::Sender<usize>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.tx.send_modify(|n| *n = n.saturating_sub(1));
    }
}
