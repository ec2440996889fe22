//! Fluent builder for gateway construction.

use std::time::Duration;

use flowgate_core::graph::{FilterCondition, END_NODE, START_NODE};
use flowgate_core::net::{Compression, ServiceConnector};

use crate::config::{GatewayConfig, NodeAddresses};
use crate::error::GatewayError;
use crate::gateway::GatewayStreamer;

/// Fluent builder for constructing a [`GatewayStreamer`].
///
/// # Example
///
/// ```rust,ignore
/// let gateway = GatewayBuilder::new()
///     .node("embed", &["rank"])
///     .node("rank", &[])
///     .entry("embed")
///     .terminal("rank")
///     .addresses("embed", &["embed:8080"], false)
///     .addresses("rank", &["rank:8080"], false)
///     .prefetch(16)
///     .build(connector)?;
/// ```
pub struct GatewayBuilder {
    config: GatewayConfig,
}

impl GatewayBuilder {
    /// Creates a builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: GatewayConfig::default(),
        }
    }

    /// Declares a node and its successors. Successors may include the
    /// `end-gateway` marker; [`terminal`](Self::terminal) is the shorthand.
    #[must_use]
    pub fn node(mut self, name: &str, successors: &[&str]) -> Self {
        self.config
            .description
            .entry(name.to_string())
            .or_default()
            .extend(successors.iter().map(|s| (*s).to_string()));
        self
    }

    /// Designates a node to receive the first request.
    #[must_use]
    pub fn entry(mut self, name: &str) -> Self {
        self.config
            .description
            .entry(START_NODE.to_string())
            .or_default()
            .push(name.to_string());
        self
    }

    /// Designates a node whose output is returned to the caller.
    #[must_use]
    pub fn terminal(mut self, name: &str) -> Self {
        self.config
            .description
            .entry(name.to_string())
            .or_default()
            .push(END_NODE.to_string());
        self
    }

    /// Registers the endpoint set for a node. `head` marks the first
    /// address as an aggregating front that receives every call.
    #[must_use]
    pub fn addresses(mut self, node: &str, addresses: &[&str], head: bool) -> Self {
        self.config.addresses.insert(
            node.to_string(),
            NodeAddresses {
                addresses: addresses.iter().map(|a| (*a).to_string()).collect(),
                head,
            },
        );
        self
    }

    /// Attaches a filter condition to a node.
    #[must_use]
    pub fn condition(mut self, node: &str, condition: FilterCondition) -> Self {
        self.config.conditions.insert(node.to_string(), condition);
        self
    }

    /// Disables branch merging at a node.
    #[must_use]
    pub fn disable_merge(mut self, node: &str) -> Self {
        self.config.disable_merge.push(node.to_string());
        self
    }

    /// Keeps terminal branch responses distinct instead of merging them.
    #[must_use]
    pub fn disable_merge_at_end(mut self) -> Self {
        self.config.disable_merge.push(END_NODE.to_string());
        self
    }

    /// Sets the default per-attempt send timeout.
    #[must_use]
    pub fn timeout_send(mut self, timeout: Duration) -> Self {
        self.config.timeout_send = Some(timeout);
        self
    }

    /// Sets the default retry budget per call.
    #[must_use]
    pub fn retries(mut self, retries: u32) -> Self {
        self.config.retries = retries;
        self
    }

    /// Sets the payload compression requested from the transport.
    #[must_use]
    pub fn compression(mut self, compression: Compression) -> Self {
        self.config.compression = compression;
        self
    }

    /// Bounds how many requests may be in flight at once (`0` = unbounded).
    #[must_use]
    pub fn prefetch(mut self, prefetch: usize) -> Self {
        self.config.prefetch = prefetch;
        self
    }

    /// Sets the name used in lifecycle logs.
    #[must_use]
    pub fn runtime_name(mut self, name: &str) -> Self {
        self.config.runtime_name = name.to_string();
        self
    }

    /// Builds the gateway around a transport.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Graph`] when the assembled description is
    /// malformed.
    pub fn build<C: ServiceConnector>(
        self,
        connector: C,
    ) -> Result<GatewayStreamer<C>, GatewayError> {
        GatewayStreamer::new(self.config, connector)
    }
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}
