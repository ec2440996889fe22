//! The gateway facade.
//!
//! `GatewayStreamer` wires the topology graph, connection pool, graph
//! executor, and request streamer into one entry point: callers hand it a
//! stream of requests (or a bulk item sequence) and read responses back,
//! then close it to drain everything in flight.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use fxhash::FxHashMap;
use tracing::info;

use flowgate_core::graph::{TopologyBuilder, TopologyGraph};
use flowgate_core::handler::GraphExecutor;
use flowgate_core::net::{ConnectionPool, HealthStatus, ServiceConnector};
use flowgate_core::request::{DataRequest, ResponseStatus};
use flowgate_core::stream::{FlightTracker, RequestOutcome, RequestStreamer, StreamError};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::metrics::{GatewayCounters, MetricsSnapshot};

/// Per-call options for [`GatewayStreamer::stream_items`].
#[derive(Debug, Clone, Default)]
pub struct ItemStreamOptions {
    /// Endpoint inside the downstream nodes that should handle the batches.
    pub exec_endpoint: Option<String>,
    /// Node-selection pattern applied to every batch.
    pub target_node: Option<String>,
    /// Parameters attached to every batch.
    pub parameters: FxHashMap<String, String>,
}

/// Streaming gateway over a topology of downstream service nodes.
///
/// Built from a [`GatewayConfig`] and a transport implementation; generic
/// over the connector so tests can run entirely in memory.
pub struct GatewayStreamer<C> {
    graph: Arc<TopologyGraph>,
    pool: Arc<ConnectionPool<C>>,
    streamer: RequestStreamer<GraphExecutor<C>>,
    tracker: FlightTracker,
    counters: Arc<GatewayCounters>,
    closed: AtomicBool,
    runtime_name: String,
}

impl<C: ServiceConnector> GatewayStreamer<C> {
    /// Builds a gateway from a configuration and a transport.
    ///
    /// Validates the topology, registers every configured endpoint with the
    /// pool, and wires the executor and streamer around one shared
    /// floating-request registry.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Graph`] when the description is malformed.
    pub fn new(config: GatewayConfig, connector: C) -> Result<Self, GatewayError> {
        let graph = Arc::new(TopologyBuilder::from_description(
            &config.description,
            config.conditions,
            &config.disable_merge,
            config.timeout_send,
            config.retries,
        )?);

        let pool = Arc::new(ConnectionPool::new(connector));
        for (node, endpoints) in &config.addresses {
            for (i, address) in endpoints.addresses.iter().enumerate() {
                pool.add_replica(node, address, endpoints.head && i == 0);
            }
        }

        let tracker = FlightTracker::new();
        let executor = GraphExecutor::new(
            Arc::clone(&graph),
            Arc::clone(&pool),
            tracker.clone(),
            config.compression,
        );
        let streamer = RequestStreamer::new(Arc::new(executor), tracker.clone(), config.prefetch);

        info!(
            runtime = %config.runtime_name,
            nodes = graph.node_count(),
            prefetch = config.prefetch,
            "gateway ready"
        );

        Ok(Self {
            graph,
            pool,
            streamer,
            tracker,
            counters: Arc::new(GatewayCounters::new()),
            closed: AtomicBool::new(false),
            runtime_name: config.runtime_name,
        })
    }

    /// Streams responses for a caller-supplied request sequence.
    ///
    /// Outcomes arrive in completion order, bounded by the configured
    /// prefetch; see [`RequestStreamer::stream`] for the slot semantics.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Closed`] once [`close`](Self::close) has been
    /// called.
    pub fn stream<S>(
        &self,
        requests: S,
    ) -> Result<impl Stream<Item = Result<RequestOutcome, StreamError>> + Send, GatewayError>
    where
        S: Stream<Item = DataRequest> + Send + 'static,
    {
        if self.closed.load(Ordering::Acquire) {
            return Err(GatewayError::Closed);
        }

        let accepted = Arc::clone(&self.counters);
        let resolved = Arc::clone(&self.counters);
        let output = self
            .streamer
            .stream(requests.inspect(move |_| {
                accepted.requests_in.fetch_add(1, Ordering::Relaxed);
            }))
            .inspect(move |item| match item {
                Ok(outcome) if outcome.is_error() => {
                    resolved.failures.fetch_add(1, Ordering::Relaxed);
                }
                Ok(outcome) => {
                    resolved
                        .responses_out
                        .fetch_add(outcome.responses.len() as u64, Ordering::Relaxed);
                }
                Err(_) => {
                    resolved.failures.fetch_add(1, Ordering::Relaxed);
                }
            });
        Ok(output)
    }

    /// Streams a bulk item sequence through the graph in fixed-size batches.
    ///
    /// Items are partitioned into batches of `batch_size` (clamped to at
    /// least 1), each dispatched as one request carrying the options'
    /// endpoint, target pattern, and parameters. The output yields the
    /// processed items of each batch, in batch completion order; callers
    /// that need full responses use [`stream`](Self::stream) instead.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Closed`] once the gateway is closed. A batch
    /// that fails downstream yields [`GatewayError::Node`] in its slot; a
    /// fatal stream failure yields [`GatewayError::Stream`] and ends the
    /// output.
    pub fn stream_items(
        &self,
        items: Vec<Bytes>,
        batch_size: usize,
        opts: &ItemStreamOptions,
    ) -> Result<impl Stream<Item = Result<Vec<Bytes>, GatewayError>> + Send, GatewayError> {
        let batch = batch_size.max(1);
        let requests: Vec<DataRequest> = items
            .chunks(batch)
            .map(|chunk| {
                let mut request = DataRequest::new(chunk.to_vec());
                if let Some(endpoint) = &opts.exec_endpoint {
                    request = request.with_endpoint(endpoint.clone());
                }
                if let Some(target) = &opts.target_node {
                    request = request.with_target(target.clone());
                }
                for (key, value) in &opts.parameters {
                    request = request.with_parameter(key.clone(), value.clone());
                }
                request
            })
            .collect();

        let output = self.stream(stream::iter(requests))?.map(|item| {
            let outcome = item?;
            for response in &outcome.responses {
                if let ResponseStatus::Error { node, message } = &response.status {
                    return Err(GatewayError::Node {
                        node: node.clone(),
                        message: message.clone(),
                    });
                }
            }
            Ok(outcome
                .responses
                .into_iter()
                .flat_map(|response| response.items)
                .collect())
        });
        Ok(output)
    }

    /// Reports the health of one node's endpoint set.
    #[must_use]
    pub fn health(&self, node: &str) -> HealthStatus {
        self.pool.health(node)
    }

    /// Takes a snapshot of the gateway counters.
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.counters.snapshot(self.tracker.in_flight())
    }

    /// Returns the validated topology.
    #[must_use]
    pub fn graph(&self) -> &TopologyGraph {
        &self.graph
    }

    /// Gracefully shuts the gateway down.
    ///
    /// New streams are rejected immediately; the method resolves after
    /// every dispatched request and floating branch has completed and the
    /// pool has drained. Safe to call more than once.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        info!(
            runtime = %self.runtime_name,
            in_flight = self.tracker.in_flight(),
            "closing gateway"
        );
        self.streamer.wait_floating_requests_end().await;
        self.pool.close().await;
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
