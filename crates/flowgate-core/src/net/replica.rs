//! Per-node endpoint sets and selection.
//!
//! Each node owns a `ReplicaSet`: its registered addresses plus the
//! selection strategy. A set either rotates cyclically across replicas
//! (deterministic round-robin) or routes everything through a designated
//! head address that fans out to replicas itself.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Health of a node's endpoint set as observed by the pool.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HealthStatus {
    /// Recent calls are succeeding.
    Healthy,

    /// Calls are failing but endpoints are still registered.
    /// Contains a description of the degradation.
    Degraded(String),

    /// No endpoints are registered for the node.
    Unhealthy(String),

    /// No calls have been observed yet.
    #[default]
    Unknown,
}

impl HealthStatus {
    /// Returns `true` if recent calls are succeeding.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    /// Returns `true` if the node can still be called.
    #[must_use]
    pub fn is_operational(&self) -> bool {
        matches!(self, HealthStatus::Healthy | HealthStatus::Degraded(_))
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "Healthy"),
            HealthStatus::Degraded(msg) => write!(f, "Degraded: {msg}"),
            HealthStatus::Unhealthy(msg) => write!(f, "Unhealthy: {msg}"),
            HealthStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

/// The endpoint set for one node.
#[derive(Debug, Default)]
pub struct ReplicaSet {
    /// Registered replica addresses, in registration order.
    addresses: Vec<String>,
    /// Aggregating head address; when set, all calls route through it.
    head: Option<String>,
    /// Round-robin cursor.
    cursor: AtomicUsize,
    /// Consecutive failed calls since the last success.
    failure_streak: AtomicU64,
    /// Whether any call has completed yet.
    observed: std::sync::atomic::AtomicBool,
}

impl ReplicaSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an address. A head address replaces any previous head.
    pub fn add(&mut self, address: &str, head: bool) {
        if head {
            self.head = Some(address.to_string());
        } else {
            self.addresses.push(address.to_string());
        }
    }

    /// Removes an address; returns `true` if it was registered.
    pub fn remove(&mut self, address: &str) -> bool {
        if self.head.as_deref() == Some(address) {
            self.head = None;
            return true;
        }
        let before = self.addresses.len();
        self.addresses.retain(|a| a != address);
        before != self.addresses.len()
    }

    /// Returns `true` if no addresses are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head.is_none() && self.addresses.is_empty()
    }

    /// Selects the address for the next call.
    ///
    /// Head routing wins when a head is registered; otherwise replicas are
    /// rotated cyclically, so selection is deterministic and testable.
    #[must_use]
    pub fn select(&self) -> Option<String> {
        if let Some(head) = &self.head {
            return Some(head.clone());
        }
        if self.addresses.is_empty() {
            return None;
        }
        let i = self.cursor.fetch_add(1, Ordering::Relaxed) % self.addresses.len();
        Some(self.addresses[i].clone())
    }

    /// Records a successful call.
    pub fn record_success(&self) {
        self.observed.store(true, Ordering::Relaxed);
        self.failure_streak.store(0, Ordering::Relaxed);
    }

    /// Records a failed call attempt.
    pub fn record_failure(&self) {
        self.observed.store(true, Ordering::Relaxed);
        self.failure_streak.fetch_add(1, Ordering::Relaxed);
    }

    /// Reports the set's health.
    #[must_use]
    pub fn health(&self) -> HealthStatus {
        if self.is_empty() {
            return HealthStatus::Unhealthy("no endpoints registered".to_string());
        }
        if !self.observed.load(Ordering::Relaxed) {
            return HealthStatus::Unknown;
        }
        let streak = self.failure_streak.load(Ordering::Relaxed);
        if streak == 0 {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded(format!("{streak} consecutive failed calls"))
        }
    }
}
