//! Error types for connection-pool operations.

use super::connector::CallError;

/// Terminal failures surfaced by the connection pool.
///
/// `Clone` because a failure fans back through shared branch futures during
/// a graph walk.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PoolError {
    /// Every attempt within the retry budget failed.
    #[error("node '{node}' unreachable after {attempts} attempts: {last}")]
    NodeUnreachable {
        /// The node that could not be reached.
        node: String,
        /// Number of attempts made (retry budget + 1).
        attempts: u32,
        /// The last attempt's failure.
        last: CallError,
    },

    /// No endpoints are registered for the node.
    #[error("no endpoints registered for node '{0}'")]
    UnknownNode(String),

    /// The pool has been closed; no further calls are accepted.
    #[error("connection pool is shut down")]
    Shutdown,
}
