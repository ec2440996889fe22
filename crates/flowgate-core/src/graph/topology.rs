//! Topology graph data structures.
//!
//! Defines `GraphNode` and `TopologyGraph`: an arena-backed, immutable DAG
//! over named downstream nodes with deterministic traversal order, cycle
//! detection, and origin/terminal/floating classification.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use fxhash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use super::condition::FilterCondition;
use super::error::GraphError;

/// Name of the virtual marker whose successors receive the first request.
pub const START_NODE: &str = "start-gateway";

/// Name of the virtual marker whose predecessors answer the caller.
pub const END_NODE: &str = "end-gateway";

/// Unique identifier for a node, a stable index into the graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// A node in the topology graph, one downstream service deployment.
///
/// Nodes are created during construction and immutable once the graph is
/// built. Successor links are stable indices, not live references.
pub struct GraphNode {
    /// Unique node identifier.
    pub id: NodeId,
    /// Deployment name, unique within the graph.
    pub name: String,
    /// Incoming edges (fan-in). `SmallVec` avoids heap alloc for <= 4 inputs.
    pub inputs: SmallVec<[NodeId; 4]>,
    /// Outgoing edges (fan-out). `SmallVec` avoids heap alloc for <= 4 outputs.
    pub outputs: SmallVec<[NodeId; 4]>,
    /// Filter condition evaluated before the node is called.
    pub condition: Option<FilterCondition>,
    /// Disables merging of multiple incoming branches at this node.
    pub merge_disabled: bool,
    /// Whether this node receives the first request.
    pub origin: bool,
    /// Whether this node's output is returned to the caller.
    pub terminal: bool,
    /// No successors and not terminal: fired but not awaited by the caller.
    pub floating: bool,
    /// Send timeout for calls to this node.
    pub timeout_send: Option<Duration>,
    /// Retry budget for calls to this node.
    pub retries: u32,
}

impl fmt::Debug for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphNode")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("merge_disabled", &self.merge_disabled)
            .field("origin", &self.origin)
            .field("terminal", &self.terminal)
            .field("floating", &self.floating)
            .finish_non_exhaustive()
    }
}

/// The complete topology graph.
///
/// Built once via [`super::TopologyBuilder`] and immutable afterwards, so it
/// needs no synchronization: the executor shares it behind an `Arc`.
pub struct TopologyGraph {
    /// Node arena indexed by `NodeId`.
    nodes: Vec<GraphNode>,
    /// Name -> `NodeId` index for lookups.
    name_index: FxHashMap<String, NodeId>,
    /// Topological traversal order (predecessors first), Kahn's algorithm
    /// with deterministic tiebreak by id.
    traversal_order: Vec<NodeId>,
    /// Nodes that receive the first request.
    origins: Vec<NodeId>,
    /// Nodes whose output is returned to the caller.
    terminals: Vec<NodeId>,
    /// Nodes fired but not awaited by the caller path.
    floating: Vec<NodeId>,
    /// Whether terminal branch outputs are merged into one response.
    merge_at_end: bool,
}

impl fmt::Debug for TopologyGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopologyGraph")
            .field("node_count", &self.nodes.len())
            .field("origins", &self.origins)
            .field("terminals", &self.terminals)
            .field("floating", &self.floating)
            .field("traversal_order", &self.traversal_order)
            .field("merge_at_end", &self.merge_at_end)
            .finish_non_exhaustive()
    }
}

impl TopologyGraph {
    /// Assembles and validates a graph from fully-formed nodes.
    ///
    /// Callers go through [`super::TopologyBuilder`]; this performs the
    /// final invariant checks shared by both construction paths.
    pub(super) fn assemble(nodes: Vec<GraphNode>, merge_at_end: bool) -> Result<Self, GraphError> {
        if nodes.is_empty() {
            return Err(GraphError::EmptyGraph);
        }

        let mut name_index = FxHashMap::default();
        for node in &nodes {
            if name_index.insert(node.name.clone(), node.id).is_some() {
                return Err(GraphError::DuplicateNode(node.name.clone()));
            }
        }

        let mut graph = Self {
            nodes,
            name_index,
            traversal_order: Vec::new(),
            origins: Vec::new(),
            terminals: Vec::new(),
            floating: Vec::new(),
            merge_at_end,
        };

        graph.classify_nodes();
        if graph.origins.is_empty() {
            return Err(GraphError::MissingEntry);
        }
        if graph.terminals.is_empty() {
            return Err(GraphError::MissingTerminal);
        }
        graph.compute_traversal_order()?;

        Ok(graph)
    }

    // ---- Accessors ----

    /// Returns the number of nodes in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the node for an id.
    ///
    /// # Panics
    ///
    /// Never panics for ids produced by this graph: they are arena indices.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &GraphNode {
        &self.nodes[id.0 as usize]
    }

    /// Returns the id for a node name.
    #[must_use]
    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.name_index.get(name).copied()
    }

    /// Returns the successors of a node.
    #[must_use]
    pub fn successors(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).outputs
    }

    /// Returns nodes in topological traversal order (predecessors first).
    #[must_use]
    pub fn traversal_order(&self) -> &[NodeId] {
        &self.traversal_order
    }

    /// Returns the nodes that receive the first request.
    #[must_use]
    pub fn origins(&self) -> &[NodeId] {
        &self.origins
    }

    /// Returns the nodes whose output is returned to the caller.
    #[must_use]
    pub fn terminals(&self) -> &[NodeId] {
        &self.terminals
    }

    /// Returns the floating nodes (fired but not awaited by the caller).
    #[must_use]
    pub fn floating(&self) -> &[NodeId] {
        &self.floating
    }

    /// Returns whether a node is floating.
    #[must_use]
    pub fn is_floating(&self, id: NodeId) -> bool {
        self.node(id).floating
    }

    /// Returns whether a node merges multiple incoming branches.
    #[must_use]
    pub fn merges_at(&self, id: NodeId) -> bool {
        !self.node(id).merge_disabled
    }

    /// Returns whether terminal branch outputs are merged into one response.
    #[must_use]
    pub fn merge_at_end(&self) -> bool {
        self.merge_at_end
    }

    // ---- Construction internals ----

    /// Classifies origin, terminal, and floating nodes.
    fn classify_nodes(&mut self) {
        for node in &mut self.nodes {
            node.floating = node.outputs.is_empty() && !node.terminal;
        }
        self.origins = self
            .nodes
            .iter()
            .filter(|n| n.origin)
            .map(|n| n.id)
            .collect();
        self.terminals = self
            .nodes
            .iter()
            .filter(|n| n.terminal)
            .map(|n| n.id)
            .collect();
        self.floating = self
            .nodes
            .iter()
            .filter(|n| n.floating)
            .map(|n| n.id)
            .collect();
    }

    /// Computes the traversal order with Kahn's algorithm, rejecting cycles.
    fn compute_traversal_order(&mut self) -> Result<(), GraphError> {
        let mut in_degree: Vec<usize> = vec![0; self.nodes.len()];
        for node in &self.nodes {
            for &succ in &node.outputs {
                in_degree[succ.0 as usize] += 1;
            }
        }

        let mut queue: VecDeque<NodeId> = VecDeque::new();
        let mut initial: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|n| in_degree[n.id.0 as usize] == 0)
            .map(|n| n.id)
            .collect();
        initial.sort_unstable();
        queue.extend(initial);

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(id) = queue.pop_front() {
            order.push(id);
            let mut ready: Vec<NodeId> = Vec::new();
            for &succ in &self.nodes[id.0 as usize].outputs {
                let deg = &mut in_degree[succ.0 as usize];
                *deg = deg.saturating_sub(1);
                if *deg == 0 {
                    ready.push(succ);
                }
            }
            ready.sort_unstable();
            queue.extend(ready);
        }

        if order.len() < self.nodes.len() {
            let ordered: FxHashSet<NodeId> = order.iter().copied().collect();
            let offender = self
                .nodes
                .iter()
                .find(|n| !ordered.contains(&n.id))
                .map_or_else(|| "unknown".to_string(), |n| n.name.clone());
            return Err(GraphError::CycleDetected(offender));
        }

        self.traversal_order = order;
        Ok(())
    }
}
