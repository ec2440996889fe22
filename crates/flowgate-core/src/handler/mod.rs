//! # Request/Result Handler
//!
//! Drives a single request through the topology graph using the connection
//! pool: fan-out duplicates the request logically to every successor,
//! fan-in waits for all active predecessors before merging (or calling once
//! per branch when merging is disabled), and terminal outputs are
//! reassembled into the caller-visible response(s).

pub mod error;
pub mod executor;

#[cfg(test)]
mod tests;

pub use error::ExecuteError;
pub use executor::GraphExecutor;
