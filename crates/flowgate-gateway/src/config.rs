//! Configuration for the gateway.

use std::time::Duration;

use flowgate_core::graph::FilterCondition;
use flowgate_core::net::Compression;
use fxhash::FxHashMap;

/// Endpoint set for one downstream node.
#[derive(Debug, Clone, Default)]
pub struct NodeAddresses {
    /// Replica addresses, rotated round-robin.
    pub addresses: Vec<String>,
    /// Whether the first address is an aggregating head that receives
    /// every call for the node.
    pub head: bool,
}

/// Configuration for a [`crate::GatewayStreamer`] instance.
///
/// The graph description maps node names to successor names and is expected
/// to contain the `start-gateway` / `end-gateway` markers; see
/// [`flowgate_core::graph::TopologyBuilder::from_description`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Node name -> successor names, with the virtual markers.
    pub description: FxHashMap<String, Vec<String>>,
    /// Node name -> endpoint set.
    pub addresses: FxHashMap<String, NodeAddresses>,
    /// Per-node filter conditions.
    pub conditions: FxHashMap<String, FilterCondition>,
    /// Nodes with branch merging disabled; may name `end-gateway`.
    pub disable_merge: Vec<String>,
    /// Default per-attempt send timeout (`None` = unbounded).
    pub timeout_send: Option<Duration>,
    /// Default retry budget per call.
    pub retries: u32,
    /// Payload compression requested from the transport.
    pub compression: Compression,
    /// How many requests may be in flight at once (`0` = unbounded).
    pub prefetch: usize,
    /// Name used in lifecycle logs.
    pub runtime_name: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            description: FxHashMap::default(),
            addresses: FxHashMap::default(),
            conditions: FxHashMap::default(),
            disable_merge: Vec::new(),
            timeout_send: None,
            retries: 0,
            compression: Compression::None,
            prefetch: 0,
            runtime_name: "gateway".to_string(),
        }
    }
}
