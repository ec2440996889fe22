//! Prefetch-bounded request streaming.
//!
//! `RequestStreamer` consumes a possibly-unbounded sequence of requests,
//! bounds how many are concurrently in flight, delegates each to a
//! [`RequestDriver`], and lazily yields one outcome per request. Outcomes
//! arrive in completion order; each carries the slot id of the request that
//! produced it.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future;
use futures::stream::{Stream, StreamExt};

use super::floating::FlightTracker;
use crate::handler::ExecuteError;
use crate::request::{DataRequest, DataResponse};

/// Drives one request to completion.
///
/// Implemented by the graph executor; the seam keeps the streamer's flow
/// control testable without a topology or pool behind it.
#[async_trait]
pub trait RequestDriver: Send + Sync + 'static {
    /// Produces the caller-visible responses for one request.
    ///
    /// # Errors
    ///
    /// Returns an [`ExecuteError`]; the streamer turns non-fatal failures
    /// into error-status response slots and fatal ones into stream
    /// termination.
    async fn drive(&self, request: DataRequest) -> Result<Vec<DataResponse>, ExecuteError>;
}

/// The outcome filling one request's slot.
///
/// Usually a single response; several when merging is disabled at the end
/// of the graph, in which case the caller gets one response per terminal
/// branch.
#[derive(Debug)]
pub struct RequestOutcome {
    /// Slot id of the request that produced this outcome.
    pub request_id: u64,
    /// The caller-visible responses.
    pub responses: Vec<DataResponse>,
}

impl RequestOutcome {
    /// Returns `true` if any response in the slot carries an error status.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.responses.iter().any(DataResponse::is_error)
    }

    /// Builds the error-status slot for a failed request.
    fn failure(request_id: u64, error: &ExecuteError) -> Self {
        Self {
            request_id,
            responses: vec![DataResponse::error(
                request_id,
                error.node(),
                error.to_string(),
            )],
        }
    }
}

/// Failures that terminate the whole output sequence.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The connection pool shut down while requests were in flight.
    #[error("connection pool shut down while requests were in flight")]
    PoolShutdown,
}

/// Flow control over a client-supplied request sequence.
pub struct RequestStreamer<D> {
    driver: Arc<D>,
    tracker: FlightTracker,
    prefetch: usize,
}

impl<D: RequestDriver> RequestStreamer<D> {
    /// Creates a streamer.
    ///
    /// `prefetch` bounds how many requests may be dispatched but unresolved
    /// at once; `0` means unbounded. The tracker is the shared
    /// floating-request registry used for graceful shutdown.
    #[must_use]
    pub fn new(driver: Arc<D>, tracker: FlightTracker, prefetch: usize) -> Self {
        Self {
            driver,
            tracker,
            prefetch,
        }
    }

    /// Streams responses for a sequence of requests.
    ///
    /// At most `prefetch` requests are outstanding at any time (when
    /// `prefetch > 0`); as one resolves, the next pending request is
    /// dispatched. A per-request failure becomes an error-status outcome in
    /// that request's slot; a fatal failure is yielded as an `Err` and ends
    /// the stream.
    pub fn stream<S>(&self, requests: S) -> impl Stream<Item = Result<RequestOutcome, StreamError>> + Send
    where
        S: Stream<Item = DataRequest> + Send + 'static,
    {
        let driver = Arc::clone(&self.driver);
        let tracker = self.tracker.clone();
        let limit = if self.prefetch == 0 {
            usize::MAX
        } else {
            self.prefetch
        };

        requests
            .map(move |request| {
                let driver = Arc::clone(&driver);
                let guard = tracker.guard();
                async move {
                    let request_id = request.request_id();
                    let result = driver.drive(request).await;
                    drop(guard);
                    match result {
                        Ok(responses) => Ok(RequestOutcome {
                            request_id,
                            responses,
                        }),
                        Err(error) if error.is_fatal() => Err(StreamError::PoolShutdown),
                        Err(error) => Ok(RequestOutcome::failure(request_id, &error)),
                    }
                }
            })
            .buffer_unordered(limit)
            .scan(false, |failed, item| {
                if *failed {
                    return future::ready(None);
                }
                *failed = item.is_err();
                future::ready(Some(item))
            })
    }

    /// Blocks until every dispatched request, including the floating
    /// branches it spawned, has completed. Returns immediately when none
    /// are outstanding.
    pub async fn wait_floating_requests_end(&self) {
        self.tracker.wait_idle().await;
    }

    /// Returns the shared floating-request registry.
    #[must_use]
    pub fn tracker(&self) -> &FlightTracker {
        &self.tracker
    }
}
