//! Unified gateway facade for Flowgate.
//!
//! Provides a single entry point ([`GatewayStreamer`]) that ties together
//! the topology graph, connection pool, graph executor, and prefetch
//! streamer from `flowgate-core`.
//!
//! # Example
//!
//! ```rust,ignore
//! use flowgate_gateway::GatewayBuilder;
//!
//! let gateway = GatewayBuilder::new()
//!     .node("embed", &["rank"])
//!     .node("rank", &[])
//!     .entry("embed")
//!     .terminal("rank")
//!     .addresses("embed", &["embed:8080"], false)
//!     .addresses("rank", &["rank:8080", "rank:8081"], false)
//!     .prefetch(16)
//!     .build(connector)?;
//!
//! let mut responses = gateway.stream(requests)?;
//! while let Some(outcome) = responses.next().await {
//!     // ...
//! }
//! gateway.close().await;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod builder;
mod config;
mod error;
mod gateway;
mod metrics;

pub use builder::GatewayBuilder;
pub use config::{GatewayConfig, NodeAddresses};
pub use error::GatewayError;
pub use gateway::{GatewayStreamer, ItemStreamOptions};
pub use metrics::{GatewayCounters, MetricsSnapshot};

/// Re-export of the routing core for callers that need its types directly.
pub use flowgate_core as core;
