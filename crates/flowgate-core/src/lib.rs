//! # Flowgate Core
//!
//! The request-routing engine of the Flowgate gateway. Four tightly coupled
//! pieces form one execution engine:
//!
//! - **Topology Graph** (`graph`): immutable DAG over named downstream
//!   nodes with fan-out, fan-in/merge, and floating-branch semantics
//! - **Connection Pool** (`net`): one-or-many endpoints per node, with
//!   deterministic selection, bounded retries, and graceful drain
//! - **Request/Result Handler** (`handler`): per-request graph walk that
//!   reassembles branch outputs into the caller-visible response(s)
//! - **Request Streamer** (`stream`): prefetch-based flow control and the
//!   floating-request registry that gates graceful shutdown
//!
//! Process bootstrap, service discovery, and the wire encoding of payloads
//! are external: the transport lives behind [`net::ServiceConnector`] and
//! payload items are opaque [`bytes::Bytes`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use flowgate_core::graph::TopologyBuilder;
//!
//! let graph = TopologyBuilder::new()
//!     .node("embed")
//!     .node("rank")
//!     .connect("embed", "rank")
//!     .entry("embed")
//!     .terminal("rank")
//!     .build()?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod graph;
pub mod handler;
pub mod net;
pub mod request;
pub mod stream;

pub use graph::{TopologyBuilder, TopologyGraph};
pub use handler::GraphExecutor;
pub use net::ConnectionPool;
pub use request::{DataRequest, DataResponse};
pub use stream::RequestStreamer;
