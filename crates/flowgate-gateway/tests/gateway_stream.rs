//! End-to-end tests for the gateway facade over the in-memory transport.

use std::time::Duration;

use bytes::Bytes;
use futures::stream::{self, StreamExt};

use flowgate_core::net::testing::MockConnector;
use flowgate_core::net::{CallError, HealthStatus};
use flowgate_core::request::DataRequest;
use flowgate_gateway::{GatewayBuilder, GatewayError, GatewayStreamer, ItemStreamOptions};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn linear_gateway() -> GatewayStreamer<MockConnector> {
    GatewayBuilder::new()
        .node("a", &["b"])
        .node("b", &[])
        .entry("a")
        .terminal("b")
        .addresses("a", &["addr-a"], false)
        .addresses("b", &["addr-b"], false)
        .prefetch(1)
        .build(MockConnector::new())
        .unwrap()
}

fn request(payload: &'static [u8]) -> DataRequest {
    DataRequest::new(vec![Bytes::from_static(payload)])
}

fn items(bytes: &[Bytes]) -> Vec<&[u8]> {
    bytes.iter().map(AsRef::as_ref).collect()
}

#[tokio::test]
async fn test_linear_stream_in_order() {
    let gateway = linear_gateway();

    let inputs = vec![request(b"r0"), request(b"r1"), request(b"r2")];
    let ids: Vec<u64> = inputs.iter().map(DataRequest::request_id).collect();

    let outcomes: Vec<_> = gateway
        .stream(stream::iter(inputs))
        .unwrap()
        .map(Result::unwrap)
        .collect()
        .await;

    assert_eq!(outcomes.len(), 3);
    // prefetch=1 dispatches one request at a time, so slots arrive in order.
    for (outcome, id) in outcomes.iter().zip(&ids) {
        assert_eq!(outcome.request_id, *id);
        assert_eq!(outcome.responses.len(), 1);
        assert!(!outcome.is_error());
    }
    assert_eq!(
        items(&outcomes[0].responses[0].items),
        vec![b"r0" as &[u8], b"addr-a", b"addr-b"]
    );
}

#[tokio::test]
async fn test_diamond_yields_one_merged_response() {
    let gateway = GatewayBuilder::new()
        .node("a", &["b", "c"])
        .node("b", &["d"])
        .node("c", &["d"])
        .node("d", &[])
        .entry("a")
        .terminal("d")
        .addresses("a", &["addr-a"], false)
        .addresses("b", &["addr-b"], false)
        .addresses("c", &["addr-c"], false)
        .addresses("d", &["addr-d"], false)
        .build(MockConnector::new())
        .unwrap();

    let outcomes: Vec<_> = gateway
        .stream(stream::iter(vec![request(b"x")]))
        .unwrap()
        .map(Result::unwrap)
        .collect()
        .await;

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].responses.len(), 1);
    assert_eq!(
        items(&outcomes[0].responses[0].items),
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
async fn test_unreachable_node_fills_error_slot_and_stream_continues() {
    let connector = MockConnector::new();
    connector.fail_always("addr-b", CallError::Transport("connection refused".to_string()));

    let gateway = GatewayBuilder::new()
        .node("a", &["b"])
        .node("b", &[])
        .entry("a")
        .terminal("b")
        .addresses("a", &["addr-a"], false)
        .addresses("b", &["addr-b"], false)
        .prefetch(1)
        .build(connector)
        .unwrap();

    let outcomes: Vec<_> = gateway
        .stream(stream::iter(vec![request(b"r0"), request(b"r1")]))
        .unwrap()
        .map(Result::unwrap)
        .collect()
        .await;

    // Every slot is served; each carries an error status naming the node.
    assert_eq!(outcomes.len(), 2);
    for outcome in &outcomes {
        assert!(outcome.is_error());
        assert_eq!(outcome.responses.len(), 1);
    }

    let metrics = gateway.metrics();
    assert_eq!(metrics.requests_in, 2);
    assert_eq!(metrics.failures, 2);
    assert_eq!(metrics.responses_out, 0);
}

#[tokio::test]
async fn test_stream_items_batches() {
    let gateway = GatewayBuilder::new()
        .node("a", &[])
        .entry("a")
        .terminal("a")
        .addresses("a", &["addr-a"], false)
        .prefetch(1)
        .build(MockConnector::new())
        .unwrap();

    let payload: Vec<Bytes> = (0..5)
        .map(|i| Bytes::from(format!("item-{i}")))
        .collect();
    let batches: Vec<_> = gateway
        .stream_items(payload, 2, &ItemStreamOptions::default())
        .unwrap()
        .map(Result::unwrap)
        .collect()
        .await;

    // 5 items in batches of 2: sizes 2, 2, 1, each with the node's address
    // appended by the echo transport.
    assert_eq!(batches.len(), 3);
    assert_eq!(
        items(&batches[0]),
        vec![b"item-0" as &[u8], b"item-1", b"addr-a"]
    );
    assert_eq!(
        items(&batches[2]),
        vec![b"item-4" as &[u8], b"addr-a"]
    );
}

#[tokio::test]
async fn test_stream_items_clamps_batch_size() {
    let gateway = linear_gateway();

    let batches: Vec<_> = gateway
        .stream_items(
            vec![Bytes::from_static(b"one"), Bytes::from_static(b"two")],
            0,
            &ItemStreamOptions::default(),
        )
        .unwrap()
        .map(Result::unwrap)
        .collect()
        .await;
    assert_eq!(batches.len(), 2);
}

#[tokio::test]
async fn test_stream_items_applies_options() {
    let gateway = linear_gateway();

    let opts = ItemStreamOptions {
        target_node: Some("b".to_string()),
        ..ItemStreamOptions::default()
    };
    let batches: Vec<_> = gateway
        .stream_items(vec![Bytes::from_static(b"x")], 1, &opts)
        .unwrap()
        .map(Result::unwrap)
        .collect()
        .await;

    // The target pattern skips node a; only b touches the batch.
    assert_eq!(batches.len(), 1);
    assert_eq!(items(&batches[0]), vec![b"x" as &[u8], b"addr-b"]);
}

#[tokio::test]
async fn test_stream_items_surfaces_node_failure() {
    let connector = MockConnector::new();
    connector.fail_always("addr-b", CallError::Rejected("bad batch".to_string()));

    let gateway = GatewayBuilder::new()
        .node("a", &["b"])
        .node("b", &[])
        .entry("a")
        .terminal("b")
        .addresses("a", &["addr-a"], false)
        .addresses("b", &["addr-b"], false)
        .build(connector)
        .unwrap();

    let batches: Vec<_> = gateway
        .stream_items(
            vec![Bytes::from_static(b"x")],
            1,
            &ItemStreamOptions::default(),
        )
        .unwrap()
        .collect()
        .await;

    assert_eq!(batches.len(), 1);
    match &batches[0] {
        Err(GatewayError::Node { node, .. }) => assert_eq!(node, "b"),
        other => panic!("expected node failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_stream_over_live_channel() {
    init_tracing();
    let gateway = linear_gateway();

    let (tx, rx) = tokio::sync::mpsc::channel(4);
    let output = gateway
        .stream(tokio_stream::wrappers::ReceiverStream::new(rx))
        .unwrap();
    let consumer = tokio::spawn(output.map(Result::unwrap).collect::<Vec<_>>());

    tx.send(request(b"r0")).await.unwrap();
    tx.send(request(b"r1")).await.unwrap();
    drop(tx);

    let outcomes = consumer.await.unwrap();
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| !o.is_error()));
}

#[tokio::test]
async fn test_close_rejects_new_streams() {
    let gateway = linear_gateway();

    gateway.close().await;
    assert!(gateway.is_closed());

    let result = gateway.stream(stream::iter(vec![request(b"late")]));
    assert!(matches!(result, Err(GatewayError::Closed)));

    // Idempotent.
    gateway.close().await;
}

#[tokio::test]
async fn test_close_waits_for_floating_branches() {
    let connector = MockConnector::new();
    connector.set_latency(Duration::from_millis(50));

    let gateway = GatewayBuilder::new()
        .node("a", &["b", "f"])
        .node("b", &[])
        .node("f", &[])
        .entry("a")
        .terminal("b")
        .addresses("a", &["addr-a"], false)
        .addresses("b", &["addr-b"], false)
        .addresses("f", &["addr-f"], false)
        .build(connector)
        .unwrap();

    let outcomes: Vec<_> = gateway
        .stream(stream::iter(vec![request(b"x")]))
        .unwrap()
        .map(Result::unwrap)
        .collect()
        .await;
    assert_eq!(outcomes.len(), 1);

    // The floating branch may still be running when the caller path is done;
    // close must not return before it lands.
    gateway.close().await;
    assert_eq!(gateway.metrics().in_flight, 0);
}

#[tokio::test]
async fn test_health_passthrough() {
    let gateway = linear_gateway();
    assert_eq!(gateway.health("a"), HealthStatus::Unknown);
    assert_eq!(gateway.health("ghost"), HealthStatus::Unknown);

    let outcomes: Vec<_> = gateway
        .stream(stream::iter(vec![request(b"x")]))
        .unwrap()
        .collect()
        .await;
    assert_eq!(outcomes.len(), 1);
    assert!(gateway.health("a").is_healthy());
    assert!(gateway.health("b").is_healthy());
}

#[tokio::test]
async fn test_metrics_count_responses() {
    let gateway = linear_gateway();

    let outcomes: Vec<_> = gateway
        .stream(stream::iter(vec![request(b"r0"), request(b"r1")]))
        .unwrap()
        .map(Result::unwrap)
        .collect()
        .await;
    assert_eq!(outcomes.len(), 2);

    let metrics = gateway.metrics();
    assert_eq!(metrics.requests_in, 2);
    assert_eq!(metrics.responses_out, 2);
    assert_eq!(metrics.failures, 0);
    assert_eq!(metrics.in_flight, 0);
}

#[tokio::test]
async fn test_malformed_description_rejected() {
    let result = GatewayBuilder::new()
        .node("a", &["a"])
        .entry("a")
        .terminal("a")
        .addresses("a", &["addr-a"], false)
        .build(MockConnector::new());
    assert!(matches!(result, Err(GatewayError::Graph(_))));
}
