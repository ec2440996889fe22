//! Error types for per-request graph execution.

use crate::net::PoolError;

/// Failure of one request's graph walk.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExecuteError {
    /// A non-floating branch failed; the failure carries the originating
    /// node's detail and becomes the request's response slot.
    #[error("node '{node}' failed: {source}")]
    NodeFailed {
        /// Node where the failure originated.
        node: String,
        /// The pool failure that ended the branch.
        #[source]
        source: PoolError,
    },

    /// The connection pool shut down mid-flight. This invalidates the whole
    /// stream, not just the request.
    #[error("connection pool closed while the request was in flight")]
    PoolClosed,
}

impl ExecuteError {
    /// Returns `true` if the failure invalidates the whole stream.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::PoolClosed)
    }

    /// Returns the name of the node where the failure originated.
    #[must_use]
    pub fn node(&self) -> &str {
        match self {
            Self::NodeFailed { node, .. } => node,
            Self::PoolClosed => "gateway",
        }
    }
}
