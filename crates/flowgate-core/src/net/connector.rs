//! Transport seam for downstream calls.
//!
//! The routing core never speaks a wire protocol itself: it hands a request
//! and a resolved address to a [`ServiceConnector`] and gets back a response
//! or a classified failure. Service discovery and payload encoding live
//! behind this trait.

use std::time::Duration;

use async_trait::async_trait;

use crate::request::{DataRequest, DataResponse};

/// Wire-compression selector passed through to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// No compression.
    #[default]
    None,
    /// Gzip body compression.
    Gzip,
    /// Deflate body compression.
    Deflate,
}

/// Options applied to a single downstream call.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Send timeout; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Compression hint for the transport.
    pub compression: Compression,
}

/// A single failed call attempt.
///
/// Every variant is transient from the pool's point of view: the pool
/// retries within the configured budget before giving up.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CallError {
    /// The endpoint could not be reached or the connection broke.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The downstream node itself reported a failure.
    #[error("node rejected request: {0}")]
    Rejected(String),

    /// The call did not complete within the send timeout.
    #[error("call timed out after {0:?}")]
    Timeout(Duration),
}

/// Sends one request to one network address.
///
/// Implementations own the actual transport (connection setup, encoding,
/// compression). They must be cheap to call concurrently; the pool shares
/// one connector across all endpoints.
#[async_trait]
pub trait ServiceConnector: Send + Sync + 'static {
    /// Sends `request` to `address` and returns the node's response.
    ///
    /// # Errors
    ///
    /// Returns a [`CallError`] classifying the failed attempt; the pool
    /// decides whether to retry.
    async fn call(
        &self,
        address: &str,
        request: DataRequest,
        opts: &CallOptions,
    ) -> Result<DataResponse, CallError>;
}
