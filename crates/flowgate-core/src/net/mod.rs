//! # Connection Pool
//!
//! Network-facing half of the routing core: per-node endpoint sets with
//! deterministic selection (round-robin or head routing), a bounded retry
//! loop, health reporting, and a graceful close that drains outstanding
//! calls before releasing the registry.
//!
//! The wire protocol itself lives behind the [`ServiceConnector`] trait;
//! the pool only decides *which* address a call goes to and *whether* a
//! failed attempt is retried.

pub mod connector;
pub mod error;
pub mod pool;
pub mod replica;
pub mod testing;


pub use connector::{CallError, CallOptions, Compression, ServiceConnector};
pub use error::PoolError;
pub use pool::ConnectionPool;
pub use replica::{HealthStatus, ReplicaSet};
