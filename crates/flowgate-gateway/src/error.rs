//! Gateway error type.

use flowgate_core::graph::GraphError;
use flowgate_core::net::PoolError;
use flowgate_core::stream::StreamError;
use thiserror::Error;

/// Errors surfaced by the gateway facade.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Topology construction failed.
    #[error("topology error: {0}")]
    Graph(#[from] GraphError),

    /// A connection pool operation failed.
    #[error("pool error: {0}")]
    Pool(#[from] PoolError),

    /// The request stream terminated fatally.
    #[error("stream error: {0}")]
    Stream(#[from] StreamError),

    /// A downstream node failed a batch during item streaming.
    #[error("node '{node}' failed: {message}")]
    Node {
        /// Name of the failing node.
        node: String,
        /// Failure detail.
        message: String,
    },

    /// The gateway has already been closed.
    #[error("gateway is closed")]
    Closed,
}
