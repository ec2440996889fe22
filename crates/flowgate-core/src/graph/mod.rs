//! # Topology Graph
//!
//! DAG over named downstream service nodes with fan-out, fan-in, and
//! floating-branch semantics.
//!
//! - **`TopologyGraph`**: immutable, arena-backed adjacency structure with
//!   deterministic traversal order
//! - **`TopologyBuilder`**: declarative (`from_description`) and fluent
//!   construction, failing fast on malformed input
//! - **`FilterCondition`**: per-node predicate pruning branches at runtime
//!
//! Construction rejects cycles, dangling successor names, and graphs with
//! no entry or terminal designation. Once built the graph never changes, so
//! the executor shares it behind an `Arc` without synchronization.

pub mod builder;
pub mod condition;
pub mod error;
pub mod topology;


pub use builder::TopologyBuilder;
pub use condition::{ConditionFn, FilterCondition};
pub use error::GraphError;
pub use topology::{GraphNode, NodeId, TopologyGraph, END_NODE, START_NODE};
