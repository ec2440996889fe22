//! Gateway observability metrics.
//!
//! Atomic counters incremented around request dispatch, plus a snapshot
//! type for querying them from user code.

use std::sync::atomic::{AtomicU64, Ordering};

/// Shared atomic counters incremented by the streaming entry points.
///
/// All reads and writes use `Ordering::Relaxed`; metrics are advisory,
/// not transactional.
#[derive(Debug, Default)]
pub struct GatewayCounters {
    /// Total requests accepted for dispatch.
    pub requests_in: AtomicU64,
    /// Total responses yielded to callers.
    pub responses_out: AtomicU64,
    /// Total request slots that resolved with an error status, plus fatal
    /// stream terminations.
    pub failures: AtomicU64,
}

impl GatewayCounters {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a snapshot of all counters; `in_flight` is sampled from the
    /// floating-request registry by the caller.
    #[must_use]
    pub fn snapshot(&self, in_flight: usize) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_in: self.requests_in.load(Ordering::Relaxed),
            responses_out: self.responses_out.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            in_flight,
        }
    }
}

/// Point-in-time view of the gateway counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Total requests accepted for dispatch.
    pub requests_in: u64,
    /// Total responses yielded to callers.
    pub responses_out: u64,
    /// Total failed request slots and fatal terminations.
    pub failures: u64,
    /// Requests and floating branches currently outstanding.
    pub in_flight: usize,
}
