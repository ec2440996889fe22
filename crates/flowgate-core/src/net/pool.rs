//! The connection pool.
//!
//! Owns every node's endpoint set, selects an endpoint per call, retries
//! transient failures within a per-call budget, and supports a graceful
//! close that drains outstanding calls before releasing the registry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fxhash::FxHashMap;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::connector::{CallError, CallOptions, Compression, ServiceConnector};
use super::error::PoolError;
use super::replica::{HealthStatus, ReplicaSet};
use crate::request::{DataRequest, DataResponse};
use crate::stream::FlightTracker;

/// Connection pool over one-or-many endpoints per named node.
///
/// The endpoint registry is read-heavy shared state: calls take a read
/// lock, administrative `add_replica`/`remove_replica` take the write lock
/// and are only eventually consistent with in-flight traffic.
pub struct ConnectionPool<C> {
    connector: Arc<C>,
    replicas: RwLock<FxHashMap<String, ReplicaSet>>,
    in_flight: FlightTracker,
    closed: AtomicBool,
}

impl<C: ServiceConnector> ConnectionPool<C> {
    /// Creates an empty pool around a connector.
    #[must_use]
    pub fn new(connector: C) -> Self {
        Self {
            connector: Arc::new(connector),
            replicas: RwLock::new(FxHashMap::default()),
            in_flight: FlightTracker::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Returns the underlying connector.
    #[must_use]
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Registers an endpoint for a node.
    ///
    /// `head` marks an aggregating front: all calls for the node route
    /// through it instead of rotating across replicas.
    pub fn add_replica(&self, node: &str, address: &str, head: bool) {
        debug!(node, address, head, "registering endpoint");
        self.replicas
            .write()
            .entry(node.to_string())
            .or_default()
            .add(address, head);
    }

    /// Removes an endpoint; returns `true` if it was registered.
    pub fn remove_replica(&self, node: &str, address: &str) -> bool {
        let mut replicas = self.replicas.write();
        let Some(set) = replicas.get_mut(node) else {
            return false;
        };
        let removed = set.remove(address);
        if set.is_empty() {
            replicas.remove(node);
        }
        removed
    }

    /// Reports the health of a node's endpoint set.
    #[must_use]
    pub fn health(&self, node: &str) -> HealthStatus {
        self.replicas
            .read()
            .get(node)
            .map_or(HealthStatus::Unknown, ReplicaSet::health)
    }

    /// Sends a request to the named node, retrying transient failures.
    ///
    /// One initial attempt plus up to `retries` re-attempts; each attempt
    /// selects an endpoint anew, so replica sets rotate to the next address
    /// on failure. `timeout` bounds each attempt, not the whole budget.
    ///
    /// # Errors
    ///
    /// `PoolError::Shutdown` once the pool is closed,
    /// `PoolError::UnknownNode` when no endpoints are registered, and
    /// `PoolError::NodeUnreachable` after the budget is exhausted.
    pub async fn call(
        &self,
        node: &str,
        request: DataRequest,
        timeout: Option<Duration>,
        retries: u32,
        compression: Compression,
    ) -> Result<DataResponse, PoolError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PoolError::Shutdown);
        }
        let _guard = self.in_flight.guard();

        let opts = CallOptions {
            timeout,
            compression,
        };
        let mut last: Option<CallError> = None;

        for attempt in 0..=retries {
            let address = self
                .replicas
                .read()
                .get(node)
                .and_then(ReplicaSet::select)
                .ok_or_else(|| PoolError::UnknownNode(node.to_string()))?;

            let result = match timeout {
                Some(limit) => {
                    match tokio::time::timeout(
                        limit,
                        self.connector.call(&address, request.clone(), &opts),
                    )
                    .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(CallError::Timeout(limit)),
                    }
                }
                None => self.connector.call(&address, request.clone(), &opts).await,
            };

            match result {
                Ok(response) => {
                    if let Some(set) = self.replicas.read().get(node) {
                        set.record_success();
                    }
                    return Ok(response);
                }
                Err(err) => {
                    warn!(node, address, attempt, error = %err, "call attempt failed");
                    if let Some(set) = self.replicas.read().get(node) {
                        set.record_failure();
                    }
                    last = Some(err);
                }
            }
        }

        Err(PoolError::NodeUnreachable {
            node: node.to_string(),
            attempts: retries + 1,
            last: last.unwrap_or_else(|| CallError::Transport("no attempt made".to_string())),
        })
    }

    /// Gracefully closes the pool.
    ///
    /// New calls are rejected immediately; the method resolves after every
    /// outstanding call has drained and the endpoint registry is released.
    /// Safe to call more than once.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        info!(
            in_flight = self.in_flight.in_flight(),
            "closing connection pool"
        );
        self.in_flight.wait_idle().await;
        self.replicas.write().clear();
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
