//! Error types for topology graph construction.

/// Errors that can occur while building or validating a topology graph.
///
/// All of these are configuration errors: they are fatal at construction
/// time and never retried.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// The graph contains a cycle involving the named node.
    #[error("cycle detected involving node: {0}")]
    CycleDetected(String),

    /// An edge references a successor that is not defined in the graph.
    #[error("node '{node}' lists undefined successor '{successor}'")]
    DanglingNode {
        /// Node declaring the edge.
        node: String,
        /// The missing successor name.
        successor: String,
    },

    /// A node with the same name was declared twice.
    #[error("duplicate node name: {0}")]
    DuplicateNode(String),

    /// No entry node was designated to receive the first request.
    #[error("no entry node designated")]
    MissingEntry,

    /// No terminal node was designated to answer the caller.
    #[error("no terminal node designated")]
    MissingTerminal,

    /// A condition or merge flag references a node that does not exist.
    #[error("unknown node referenced in configuration: {0}")]
    UnknownNode(String),

    /// The graph has no nodes.
    #[error("empty graph: no nodes")]
    EmptyGraph,
}
