//! Testing utilities for the routing core.
//!
//! Provides a scriptable in-memory [`MockConnector`] used by the crate's
//! own tests and by downstream integration tests: per-address failure
//! plans, optional latency injection, a call log, and a peak-concurrency
//! probe.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use fxhash::FxHashMap;
use parking_lot::Mutex;

use super::connector::{CallError, CallOptions, ServiceConnector};
use crate::request::{DataRequest, DataResponse};

/// Scripted failure behavior for one address.
#[derive(Debug, Clone)]
enum FailurePlan {
    /// Fail the next `n` calls, then succeed.
    Times(u64, CallError),
    /// Fail every call.
    Always(CallError),
}

/// In-memory connector that echoes requests back as responses.
///
/// A successful call returns the request's items with the called address
/// appended as one extra item, so tests can read the path a payload took
/// straight out of the response body.
#[derive(Default)]
pub struct MockConnector {
    plans: Mutex<FxHashMap<String, FailurePlan>>,
    calls: Mutex<Vec<String>>,
    latency: Mutex<Option<Duration>>,
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl MockConnector {
    /// Creates an echoing connector with no scripted failures.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the next `n` calls to `address` with `error`, then succeeds.
    pub fn fail_times(&self, address: &str, n: u64, error: CallError) {
        self.plans
            .lock()
            .insert(address.to_string(), FailurePlan::Times(n, error));
    }

    /// Fails every call to `address` with `error`.
    pub fn fail_always(&self, address: &str, error: CallError) {
        self.plans
            .lock()
            .insert(address.to_string(), FailurePlan::Always(error));
    }

    /// Sleeps for `latency` before answering each call.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    /// Returns the addresses called so far, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Returns how many calls hit `address`.
    #[must_use]
    pub fn call_count(&self, address: &str) -> usize {
        self.calls.lock().iter().filter(|a| *a == address).count()
    }

    /// Returns the highest number of calls observed in flight at once.
    #[must_use]
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }

    fn next_outcome(&self, address: &str) -> Result<(), CallError> {
        let mut plans = self.plans.lock();
        match plans.get_mut(address) {
            Some(FailurePlan::Always(err)) => Err(err.clone()),
            Some(FailurePlan::Times(n, err)) => {
                if *n == 0 {
                    Ok(())
                } else {
                    *n -= 1;
                    Err(err.clone())
                }
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ServiceConnector for MockConnector {
    async fn call(
        &self,
        address: &str,
        request: DataRequest,
        _opts: &CallOptions,
    ) -> Result<DataResponse, CallError> {
        self.calls.lock().push(address.to_string());

        let live = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(live, Ordering::SeqCst);

        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let outcome = self.next_outcome(address);
        self.current.fetch_sub(1, Ordering::SeqCst);
        outcome?;

        let mut response = DataResponse::carrying(&request);
        response.items.push(Bytes::from(address.to_string()));
        Ok(response)
    }
}
