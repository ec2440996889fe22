//! Per-request graph execution.
//!
//! `GraphExecutor` drives one inbound request through the topology: one
//! future per node, built in traversal order so every node future awaits
//! its predecessors' shared futures (the fan-in barrier), calls the
//! connection pool, and hands its output to its successors. Floating
//! branches are spawned and tracked but never awaited by the caller path.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{join_all, BoxFuture, FutureExt, Shared};
use fxhash::FxHashMap;
use tracing::{debug, warn};

use super::error::ExecuteError;
use crate::graph::{NodeId, TopologyGraph};
use crate::net::{Compression, ConnectionPool, PoolError, ServiceConnector};
use crate::request::{DataRequest, DataResponse, RequestHeader};
use crate::stream::{FlightTracker, RequestDriver};

/// Failure of one branch, fanned back through shared futures.
#[derive(Debug, Clone)]
struct BranchFailure {
    node: String,
    error: PoolError,
}

/// A branch's contribution: zero responses when pruned, one after a merged
/// call, several when merging is disabled at the node.
type BranchOutput = Result<Vec<Arc<DataResponse>>, BranchFailure>;

type BranchFuture = Shared<BoxFuture<'static, BranchOutput>>;

/// Executes one request at a time against the graph and the pool.
///
/// Merge policy (deterministic by construction): item sequences concatenate
/// in predecessor order, parameters merge last-writer-wins in the same
/// order. A node with merging disabled is called once per incoming branch
/// and still waits for all of its active predecessors before emitting.
pub struct GraphExecutor<C> {
    graph: Arc<TopologyGraph>,
    pool: Arc<ConnectionPool<C>>,
    tracker: FlightTracker,
    compression: Compression,
}

impl<C: ServiceConnector> GraphExecutor<C> {
    /// Creates an executor over a graph and pool.
    ///
    /// The tracker is the process-wide floating-request registry shared
    /// with the streamer; floating branches register with it so graceful
    /// shutdown can wait for them.
    #[must_use]
    pub fn new(
        graph: Arc<TopologyGraph>,
        pool: Arc<ConnectionPool<C>>,
        tracker: FlightTracker,
        compression: Compression,
    ) -> Self {
        Self {
            graph,
            pool,
            tracker,
            compression,
        }
    }

    /// Walks the graph for one request and returns the caller-visible
    /// responses: one merged response, or one per terminal branch when
    /// merging is disabled at the end.
    ///
    /// # Errors
    ///
    /// `ExecuteError::NodeFailed` when a non-floating branch exhausts its
    /// retry budget or is rejected; `ExecuteError::PoolClosed` when the
    /// pool shut down mid-flight.
    pub async fn execute(&self, request: DataRequest) -> Result<Vec<DataResponse>, ExecuteError> {
        let request_id = request.request_id();
        let request = Arc::new(request);

        // Build one shared future per node, predecessors first.
        let mut branches: FxHashMap<NodeId, BranchFuture> = FxHashMap::default();
        for &id in self.graph.traversal_order() {
            let preds: Vec<BranchFuture> = self
                .graph
                .node(id)
                .inputs
                .iter()
                .map(|p| branches[p].clone())
                .collect();
            let fut = Self::run_branch(
                Arc::clone(&self.graph),
                Arc::clone(&self.pool),
                self.compression,
                Arc::clone(&request),
                id,
                preds,
            )
            .boxed()
            .shared();
            branches.insert(id, fut);
        }

        // Floating branches: fired, tracked, never awaited here.
        for id in self.graph.floating() {
            let fut = branches[id].clone();
            let guard = self.tracker.guard();
            tokio::spawn(async move {
                match fut.await {
                    Ok(_) => {}
                    Err(failure) => {
                        warn!(node = %failure.node, error = %failure.error, "floating branch failed");
                    }
                }
                drop(guard);
            });
        }

        // The end of the graph is a join over the terminal nodes.
        let terminal_futs: Vec<BranchFuture> = self
            .graph
            .terminals()
            .iter()
            .map(|id| branches[id].clone())
            .collect();

        let mut responses: Vec<DataResponse> = Vec::new();
        for result in join_all(terminal_futs).await {
            match result {
                Ok(outputs) => responses.extend(outputs.iter().map(|r| (**r).clone())),
                Err(failure) => {
                    if matches!(failure.error, PoolError::Shutdown) {
                        return Err(ExecuteError::PoolClosed);
                    }
                    return Err(ExecuteError::NodeFailed {
                        node: failure.node,
                        source: failure.error,
                    });
                }
            }
        }

        if responses.is_empty() {
            // Every terminal path was pruned; the slot still gets a response.
            debug!(request_id, "all terminal branches pruned");
            return Ok(vec![DataResponse {
                request_id,
                ..DataResponse::default()
            }]);
        }
        if self.graph.merge_at_end() && responses.len() > 1 {
            return Ok(vec![merge_responses(request_id, &responses)]);
        }
        Ok(responses)
    }

    /// One node's branch: await predecessors, apply the node's filter and
    /// merge policy, call the pool, emit outputs for successors.
    async fn run_branch(
        graph: Arc<TopologyGraph>,
        pool: Arc<ConnectionPool<C>>,
        compression: Compression,
        origin: Arc<DataRequest>,
        id: NodeId,
        preds: Vec<BranchFuture>,
    ) -> BranchOutput {
        let node = graph.node(id);

        // Fan-in barrier: a join node never proceeds before all of its
        // active predecessors have resolved or definitively failed.
        let mut inputs: Vec<Arc<DataResponse>> = Vec::new();
        if node.origin {
            inputs.push(Arc::new(DataResponse::carrying(&origin)));
        }
        for pred in join_all(preds).await {
            match pred {
                Ok(outputs) => inputs.extend(outputs),
                Err(failure) => return Err(failure),
            }
        }
        if inputs.is_empty() {
            // Every incoming path was pruned upstream.
            return Ok(Vec::new());
        }

        let requests: Vec<DataRequest> = if node.merge_disabled {
            inputs
                .iter()
                .map(|input| request_from(&origin.header, input))
                .collect()
        } else {
            vec![merged_request(&origin.header, &inputs)]
        };

        // Node-selection pattern: a non-matching node forwards its input
        // downstream unchanged instead of processing it.
        if let Some(pattern) = origin.header.target_node.as_deref() {
            if !matches_target(pattern, &node.name) {
                debug!(node = %node.name, pattern, "node outside target pattern, forwarding");
                return Ok(requests
                    .iter()
                    .map(|r| Arc::new(DataResponse::carrying(r)))
                    .collect());
            }
        }

        let mut calls = Vec::new();
        for request in requests {
            if let Some(condition) = &node.condition {
                if !condition.evaluate(&request) {
                    debug!(node = %node.name, "branch pruned by condition");
                    continue;
                }
            }
            calls.push(pool.call(
                &node.name,
                request,
                node.timeout_send,
                node.retries,
                compression,
            ));
        }
        if calls.is_empty() {
            return Ok(Vec::new());
        }

        let mut outputs = Vec::with_capacity(calls.len());
        for result in join_all(calls).await {
            match result {
                Ok(response) => outputs.push(Arc::new(response)),
                Err(error) => {
                    return Err(BranchFailure {
                        node: node.name.clone(),
                        error,
                    });
                }
            }
        }
        Ok(outputs)
    }
}

#[async_trait]
impl<C: ServiceConnector> RequestDriver for GraphExecutor<C> {
    async fn drive(&self, request: DataRequest) -> Result<Vec<DataResponse>, ExecuteError> {
        self.execute(request).await
    }
}

/// Builds the request for one incoming branch, with its own header and
/// parameter copies; item buffers are shared read-only.
fn request_from(header: &RequestHeader, input: &DataResponse) -> DataRequest {
    DataRequest {
        header: header.clone(),
        items: input.items.clone(),
        parameters: input.parameters.clone(),
    }
}

/// Merges incoming branches into one request: items concatenated in
/// predecessor order, parameters last-writer-wins in the same order.
fn merged_request(header: &RequestHeader, inputs: &[Arc<DataResponse>]) -> DataRequest {
    let mut items = Vec::new();
    let mut parameters = fxhash::FxHashMap::default();
    for input in inputs {
        items.extend(input.items.iter().cloned());
        for (key, value) in &input.parameters {
            parameters.insert(key.clone(), value.clone());
        }
    }
    DataRequest {
        header: header.clone(),
        items,
        parameters,
    }
}

/// Merges terminal branch responses into the single caller-visible one.
fn merge_responses(request_id: u64, responses: &[DataResponse]) -> DataResponse {
    let mut merged = DataResponse {
        request_id,
        ..DataResponse::default()
    };
    for response in responses {
        merged.items.extend(response.items.iter().cloned());
        for (key, value) in &response.parameters {
            merged.parameters.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Matches a node name against a target pattern: exact, or `prefix*` glob.
fn matches_target(pattern: &str, name: &str) -> bool {
    pattern
        .strip_suffix('*')
        .map_or(pattern == name, |prefix| name.starts_with(prefix))
}
