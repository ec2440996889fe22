//! Unit tests for the per-request graph walk: fan-out, fan-in merge,
//! pruning, floating branches, and failure propagation.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use super::error::ExecuteError;
use super::executor::GraphExecutor;
use crate::graph::{FilterCondition, TopologyBuilder, TopologyGraph};
use crate::net::testing::MockConnector;
use crate::net::{CallError, Compression, ConnectionPool, PoolError};
use crate::request::{DataRequest, DataResponse, ResponseStatus};
use crate::stream::FlightTracker;

/// Executor wired to a mock pool with one `addr-<name>` endpoint per node.
struct Fixture {
    exec: GraphExecutor<MockConnector>,
    pool: Arc<ConnectionPool<MockConnector>>,
    tracker: FlightTracker,
}

impl Fixture {
    fn new(graph: TopologyGraph) -> Self {
        let pool = Arc::new(ConnectionPool::new(MockConnector::new()));
        for &id in graph.traversal_order() {
            let name = &graph.node(id).name;
            pool.add_replica(name, &format!("addr-{name}"), false);
        }
        let tracker = FlightTracker::new();
        let exec = GraphExecutor::new(
            Arc::new(graph),
            Arc::clone(&pool),
            tracker.clone(),
            Compression::None,
        );
        Self {
            exec,
            pool,
            tracker,
        }
    }

    fn connector(&self) -> &MockConnector {
        self.pool.connector()
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn request() -> DataRequest {
    DataRequest::new(vec![Bytes::from_static(b"x")])
}

fn items(response: &DataResponse) -> Vec<&[u8]> {
    response.items.iter().map(|b| b.as_ref()).collect()
}

fn linear_graph() -> TopologyGraph {
    TopologyBuilder::new()
        .node("a")
        .node("b")
        .connect("a", "b")
        .entry("a")
        .terminal("b")
        .build()
        .unwrap()
}

fn diamond_graph() -> TopologyGraph {
    TopologyBuilder::new()
        .node("a")
        .node("b")
        .node("c")
        .node("d")
        .connect("a", "b")
        .connect("a", "c")
        .connect("b", "d")
        .connect("c", "d")
        .entry("a")
        .terminal("d")
        .build()
        .unwrap()
}

fn floating_graph() -> TopologyGraph {
    TopologyBuilder::new()
        .node("a")
        .node("b")
        .node("f")
        .connect("a", "b")
        .connect("a", "f")
        .entry("a")
        .terminal("b")
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_linear_walk_threads_payload_through_nodes() {
    let fx = Fixture::new(linear_graph());
    let req = request();
    let request_id = req.request_id();

    let responses = fx.exec.execute(req).await.unwrap();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].request_id, request_id);
    // The echo connector appends the called address to the item trail.
    assert_eq!(
        items(&responses[0]),
        vec![b"x" as &[u8], b"addr-a", b"addr-b"]
    );
}

#[tokio::test]
async fn test_diamond_merges_branches_in_predecessor_order() {
    let fx = Fixture::new(diamond_graph());
    let responses = fx.exec.execute(request()).await.unwrap();

    assert_eq!(responses.len(), 1);
    assert_eq!(
        items(&responses[0]),
        vec![
            b"x" as &[u8],
            b"addr-a",
            b"addr-b",
            b"x",
            b"addr-a",
            b"addr-c",
            b"addr-d",
        ]
    );
}

#[tokio::test]
async fn test_fan_out_branches_call_upstream_once() {
    let fx = Fixture::new(diamond_graph());
    fx.exec.execute(request()).await.unwrap();

    // Shared branch futures: both b and c consume a's single output.
    assert_eq!(fx.connector().call_count("addr-a"), 1);
    assert_eq!(fx.connector().call_count("addr-d"), 1);
}

#[tokio::test]
async fn test_disabled_merge_calls_join_once_per_branch() {
    let graph = TopologyBuilder::new()
        .node("a")
        .node("b")
        .node("c")
        .node("d")
        .connect("a", "b")
        .connect("a", "c")
        .connect("b", "d")
        .connect("c", "d")
        .entry("a")
        .terminal("d")
        .disable_merge("d")
        .disable_merge_at_end()
        .build()
        .unwrap();
    let fx = Fixture::new(graph);

    let responses = fx.exec.execute(request()).await.unwrap();
    // One call per incoming branch at the join, left unmerged at the end.
    assert_eq!(fx.connector().call_count("addr-d"), 2);
    assert_eq!(responses.len(), 2);
    assert_eq!(
        items(&responses[0]),
        vec![b"x" as &[u8], b"addr-a", b"addr-b", b"addr-d"]
    );
    assert_eq!(
        items(&responses[1]),
        vec![b"x" as &[u8], b"addr-a", b"addr-c", b"addr-d"]
    );
}

#[tokio::test]
async fn test_two_terminals_merge_at_end() {
    let graph = TopologyBuilder::new()
        .node("a")
        .node("b")
        .node("c")
        .connect("a", "b")
        .connect("a", "c")
        .entry("a")
        .terminal("b")
        .terminal("c")
        .build()
        .unwrap();
    let fx = Fixture::new(graph);

    let responses = fx.exec.execute(request()).await.unwrap();
    assert_eq!(responses.len(), 1);
    assert_eq!(
        items(&responses[0]),
        vec![
            b"x" as &[u8],
            b"addr-a",
            b"addr-b",
            b"x",
            b"addr-a",
            b"addr-c",
        ]
    );
}

#[tokio::test]
async fn test_two_terminals_without_end_merge() {
    let graph = TopologyBuilder::new()
        .node("a")
        .node("b")
        .node("c")
        .connect("a", "b")
        .connect("a", "c")
        .entry("a")
        .terminal("b")
        .terminal("c")
        .disable_merge_at_end()
        .build()
        .unwrap();
    let fx = Fixture::new(graph);

    let responses = fx.exec.execute(request()).await.unwrap();
    assert_eq!(responses.len(), 2);
}

#[tokio::test]
async fn test_condition_prunes_branch() {
    let graph = TopologyBuilder::new()
        .node("a")
        .node("b")
        .node("c")
        .connect("a", "b")
        .connect("a", "c")
        .entry("a")
        .terminal("b")
        .terminal("c")
        .condition(
            "c",
            FilterCondition::ParamEquals {
                key: "env".to_string(),
                value: "prod".to_string(),
            },
        )
        .build()
        .unwrap();
    let fx = Fixture::new(graph);

    let responses = fx.exec.execute(request()).await.unwrap();
    assert_eq!(responses.len(), 1);
    assert_eq!(
        items(&responses[0]),
        vec![b"x" as &[u8], b"addr-a", b"addr-b"]
    );
    assert_eq!(fx.connector().call_count("addr-c"), 0);
}

#[tokio::test]
async fn test_condition_passes_matching_request() {
    let graph = TopologyBuilder::new()
        .node("a")
        .entry("a")
        .terminal("a")
        .condition(
            "a",
            FilterCondition::ParamEquals {
                key: "env".to_string(),
                value: "prod".to_string(),
            },
        )
        .build()
        .unwrap();
    let fx = Fixture::new(graph);

    let responses = fx
        .exec
        .execute(request().with_parameter("env", "prod"))
        .await
        .unwrap();
    assert_eq!(items(&responses[0]), vec![b"x" as &[u8], b"addr-a"]);
}

#[tokio::test]
async fn test_all_branches_pruned_yields_empty_success() {
    let graph = TopologyBuilder::new()
        .node("a")
        .entry("a")
        .terminal("a")
        .condition(
            "a",
            FilterCondition::ParamExists {
                key: "missing".to_string(),
            },
        )
        .build()
        .unwrap();
    let fx = Fixture::new(graph);

    let req = request();
    let request_id = req.request_id();
    let responses = fx.exec.execute(req).await.unwrap();

    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].request_id, request_id);
    assert!(responses[0].items.is_empty());
    assert!(matches!(responses[0].status, ResponseStatus::Success));
    assert_eq!(fx.connector().call_count("addr-a"), 0);
}

#[tokio::test]
async fn test_branch_failure_fails_the_request() {
    let fx = Fixture::new(linear_graph());
    fx.connector()
        .fail_always("addr-b", CallError::Rejected("bad input".to_string()));

    let result = fx.exec.execute(request()).await;
    match result {
        Err(ExecuteError::NodeFailed { node, source }) => {
            assert_eq!(node, "b");
            assert!(matches!(source, PoolError::NodeUnreachable { .. }));
        }
        other => panic!("expected NodeFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_floating_branch_runs_off_the_caller_path() {
    let graph = floating_graph();
    let f = graph.node_id("f").unwrap();
    assert!(graph.is_floating(f));

    let fx = Fixture::new(graph);
    fx.connector().set_latency(Duration::from_millis(10));

    let responses = fx.exec.execute(request()).await.unwrap();
    assert_eq!(responses.len(), 1);
    assert_eq!(
        items(&responses[0]),
        vec![b"x" as &[u8], b"addr-a", b"addr-b"]
    );

    fx.tracker.wait_idle().await;
    assert_eq!(fx.connector().call_count("addr-f"), 1);
}

#[tokio::test]
async fn test_floating_failure_does_not_surface() {
    init_tracing();
    let fx = Fixture::new(floating_graph());
    fx.connector()
        .fail_always("addr-f", CallError::Transport("down".to_string()));

    let responses = fx.exec.execute(request()).await.unwrap();
    assert!(!responses[0].is_error());
    fx.tracker.wait_idle().await;
}

#[tokio::test]
async fn test_target_pattern_skips_non_matching_nodes() {
    let fx = Fixture::new(linear_graph());

    let responses = fx.exec.execute(request().with_target("b")).await.unwrap();
    // Node a forwards the payload untouched; only b processes it.
    assert_eq!(items(&responses[0]), vec![b"x" as &[u8], b"addr-b"]);
    assert_eq!(fx.connector().call_count("addr-a"), 0);
}

#[tokio::test]
async fn test_target_prefix_glob() {
    let graph = TopologyBuilder::new()
        .node("rank-fast")
        .node("rank-slow")
        .connect("rank-fast", "rank-slow")
        .entry("rank-fast")
        .terminal("rank-slow")
        .build()
        .unwrap();
    let fx = Fixture::new(graph);

    let responses = fx
        .exec
        .execute(request().with_target("rank-*"))
        .await
        .unwrap();
    assert_eq!(
        items(&responses[0]),
        vec![b"x" as &[u8], b"addr-rank-fast", b"addr-rank-slow"]
    );
}

#[tokio::test]
async fn test_closed_pool_is_fatal() {
    let fx = Fixture::new(linear_graph());
    fx.pool.close().await;

    let result = fx.exec.execute(request()).await;
    match result {
        Err(error) => {
            assert!(matches!(error, ExecuteError::PoolClosed));
            assert!(error.is_fatal());
        }
        Ok(responses) => panic!("expected fatal error, got {responses:?}"),
    }
}

#[tokio::test]
async fn test_per_node_retry_budget_applies() {
    let graph = TopologyBuilder::new()
        .node("a")
        .entry("a")
        .terminal("a")
        .retries_for("a", 2)
        .build()
        .unwrap();
    let fx = Fixture::new(graph);
    fx.connector()
        .fail_times("addr-a", 2, CallError::Transport("flaky".to_string()));

    let responses = fx.exec.execute(request()).await.unwrap();
    assert!(!responses[0].is_error());
    assert_eq!(fx.connector().call_count("addr-a"), 3);
}
