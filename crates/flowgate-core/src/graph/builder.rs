//! Topology builder API.
//!
//! Two construction paths produce the same validated [`TopologyGraph`]: the
//! declarative [`TopologyBuilder::from_description`] path driven by a
//! node-name -> successor-names map (with the `start-gateway` /
//! `end-gateway` markers), and a fluent path for programmatic construction.
//! Both fail fast on malformed input.

use std::time::Duration;

use fxhash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use super::condition::FilterCondition;
use super::error::GraphError;
use super::topology::{GraphNode, NodeId, TopologyGraph, END_NODE, START_NODE};

/// Fluent builder for [`TopologyGraph`] construction.
///
/// # Example
///
/// ```rust,ignore
/// use flowgate_core::graph::TopologyBuilder;
///
/// let graph = TopologyBuilder::new()
///     .node("ingest")
///     .node("embed")
///     .node("index")
///     .connect("ingest", "embed")
///     .connect("embed", "index")
///     .entry("ingest")
///     .terminal("index")
///     .build()?;
/// ```
pub struct TopologyBuilder {
    /// Node names in declaration order.
    names: Vec<String>,
    /// Edges by name.
    edges: Vec<(String, String)>,
    /// Entry designations.
    entries: FxHashSet<String>,
    /// Terminal designations.
    terminals: FxHashSet<String>,
    /// Per-node filter conditions.
    conditions: FxHashMap<String, FilterCondition>,
    /// Nodes with branch merging disabled.
    no_merge: FxHashSet<String>,
    /// Per-node send timeout overrides.
    timeout_overrides: FxHashMap<String, Duration>,
    /// Per-node retry budget overrides.
    retry_overrides: FxHashMap<String, u32>,
    /// Default send timeout.
    timeout_send: Option<Duration>,
    /// Default retry budget.
    retries: u32,
    /// Whether terminal branch outputs are merged into one response.
    merge_at_end: bool,
}

impl TopologyBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            names: Vec::new(),
            edges: Vec::new(),
            entries: FxHashSet::default(),
            terminals: FxHashSet::default(),
            conditions: FxHashMap::default(),
            no_merge: FxHashSet::default(),
            timeout_overrides: FxHashMap::default(),
            retry_overrides: FxHashMap::default(),
            timeout_send: None,
            retries: 0,
            merge_at_end: true,
        }
    }

    /// Builds a graph from a declarative description.
    ///
    /// The map is expected to contain the `start-gateway` marker whose
    /// successors receive the first request; nodes listing `end-gateway` as
    /// a successor answer the caller. The markers never become real nodes.
    /// `disable_merge` may name `end-gateway` to keep terminal branch
    /// responses distinct.
    ///
    /// # Errors
    ///
    /// Returns a [`GraphError`] for a missing entry or terminal designation,
    /// dangling successor names, cycles, or configuration flags referencing
    /// unknown nodes.
    pub fn from_description(
        description: &FxHashMap<String, Vec<String>>,
        conditions: FxHashMap<String, FilterCondition>,
        disable_merge: &[String],
        timeout_send: Option<Duration>,
        retries: u32,
    ) -> Result<TopologyGraph, GraphError> {
        let mut builder = Self::new().timeout_send_opt(timeout_send).retries(retries);

        // Declare real nodes in a stable order.
        let mut names: Vec<&String> = description
            .keys()
            .filter(|name| *name != START_NODE && *name != END_NODE)
            .collect();
        names.sort_unstable();
        for name in &names {
            builder = builder.node(name);
        }

        let start = description.get(START_NODE).ok_or(GraphError::MissingEntry)?;
        for successor in start {
            builder = builder.entry(successor);
        }

        // Add edges in the same stable name order so predecessor order (and
        // therefore merge order) is deterministic.
        for name in &names {
            let successors = &description[*name];
            for successor in successors {
                if successor == END_NODE {
                    builder = builder.terminal(name);
                } else {
                    builder = builder.connect(name, successor);
                }
            }
        }

        for (name, condition) in conditions {
            builder = builder.condition(&name, condition);
        }
        for name in disable_merge {
            if name == END_NODE {
                builder = builder.disable_merge_at_end();
            } else {
                builder = builder.disable_merge(name);
            }
        }

        builder.build()
    }

    /// Declares a node.
    #[must_use]
    pub fn node(mut self, name: &str) -> Self {
        self.names.push(name.to_string());
        self
    }

    /// Connects two nodes with a directed edge.
    #[must_use]
    pub fn connect(mut self, from: &str, to: &str) -> Self {
        self.edges.push((from.to_string(), to.to_string()));
        self
    }

    /// Designates a node to receive the first request.
    #[must_use]
    pub fn entry(mut self, name: &str) -> Self {
        self.entries.insert(name.to_string());
        self
    }

    /// Designates a node whose output is returned to the caller.
    #[must_use]
    pub fn terminal(mut self, name: &str) -> Self {
        self.terminals.insert(name.to_string());
        self
    }

    /// Attaches a filter condition to a node.
    #[must_use]
    pub fn condition(mut self, name: &str, condition: FilterCondition) -> Self {
        self.conditions.insert(name.to_string(), condition);
        self
    }

    /// Disables branch merging at a node.
    #[must_use]
    pub fn disable_merge(mut self, name: &str) -> Self {
        self.no_merge.insert(name.to_string());
        self
    }

    /// Keeps terminal branch responses distinct instead of merging them.
    #[must_use]
    pub fn disable_merge_at_end(mut self) -> Self {
        self.merge_at_end = false;
        self
    }

    /// Sets the default send timeout for every node.
    #[must_use]
    pub fn timeout_send(mut self, timeout: Duration) -> Self {
        self.timeout_send = Some(timeout);
        self
    }

    /// Overrides the send timeout for one node.
    #[must_use]
    pub fn timeout_for(mut self, name: &str, timeout: Duration) -> Self {
        self.timeout_overrides.insert(name.to_string(), timeout);
        self
    }

    /// Sets the default retry budget for every node.
    #[must_use]
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Overrides the retry budget for one node.
    #[must_use]
    pub fn retries_for(mut self, name: &str, retries: u32) -> Self {
        self.retry_overrides.insert(name.to_string(), retries);
        self
    }

    fn timeout_send_opt(mut self, timeout: Option<Duration>) -> Self {
        self.timeout_send = timeout;
        self
    }

    /// Builds the immutable, validated graph.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::EmptyGraph` if no nodes were declared,
    /// `GraphError::DuplicateNode` for repeated names,
    /// `GraphError::DanglingNode` for edges to undeclared nodes,
    /// `GraphError::UnknownNode` for designations or flags referencing
    /// undeclared nodes, `GraphError::MissingEntry` /
    /// `GraphError::MissingTerminal` when no entry or terminal exists, and
    /// `GraphError::CycleDetected` when the graph is not acyclic.
    pub fn build(self) -> Result<TopologyGraph, GraphError> {
        if self.names.is_empty() {
            return Err(GraphError::EmptyGraph);
        }

        let mut index: FxHashMap<String, NodeId> = FxHashMap::default();
        for (i, name) in self.names.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let id = NodeId(i as u32);
            if index.insert(name.clone(), id).is_some() {
                return Err(GraphError::DuplicateNode(name.clone()));
            }
        }

        for referenced in self
            .entries
            .iter()
            .chain(self.terminals.iter())
            .chain(self.conditions.keys())
            .chain(self.no_merge.iter())
            .chain(self.timeout_overrides.keys())
            .chain(self.retry_overrides.keys())
        {
            if !index.contains_key(referenced) {
                return Err(GraphError::UnknownNode(referenced.clone()));
            }
        }

        let mut inputs: Vec<SmallVec<[NodeId; 4]>> = vec![SmallVec::new(); self.names.len()];
        let mut outputs: Vec<SmallVec<[NodeId; 4]>> = vec![SmallVec::new(); self.names.len()];
        for (from, to) in &self.edges {
            let Some(&from_id) = index.get(from) else {
                return Err(GraphError::UnknownNode(from.clone()));
            };
            let Some(&to_id) = index.get(to) else {
                return Err(GraphError::DanglingNode {
                    node: from.clone(),
                    successor: to.clone(),
                });
            };
            outputs[from_id.0 as usize].push(to_id);
            inputs[to_id.0 as usize].push(from_id);
        }

        let mut conditions = self.conditions;
        let nodes: Vec<GraphNode> = self
            .names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                #[allow(clippy::cast_possible_truncation)]
                let id = NodeId(i as u32);
                GraphNode {
                    id,
                    name: name.clone(),
                    inputs: std::mem::take(&mut inputs[i]),
                    outputs: std::mem::take(&mut outputs[i]),
                    condition: conditions.remove(name),
                    merge_disabled: self.no_merge.contains(name),
                    origin: self.entries.contains(name),
                    terminal: self.terminals.contains(name),
                    floating: false, // classified during assembly
                    timeout_send: self
                        .timeout_overrides
                        .get(name)
                        .copied()
                        .or(self.timeout_send),
                    retries: self
                        .retry_overrides
                        .get(name)
                        .copied()
                        .unwrap_or(self.retries),
                }
            })
            .collect();

        TopologyGraph::assemble(nodes, self.merge_at_end)
    }
}

impl Default for TopologyBuilder {
    fn default() -> Self {
        Self::new()
    }
}
