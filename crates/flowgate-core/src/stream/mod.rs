//! # Request Streamer
//!
//! Flow control over the inbound request sequence: prefetch bounds the
//! number of requests concurrently in flight, every dispatched request is
//! registered in the floating-request registry, and graceful shutdown
//! waits for the registry to drain.

pub mod floating;
pub mod streamer;


pub use floating::{FlightGuard, FlightTracker};
pub use streamer::{RequestDriver, RequestOutcome, RequestStreamer, StreamError};
