//! Request and response payload types.
//!
//! The wire encoding of payloads is external to the routing core: a request
//! is a header, an ordered sequence of opaque items, and a string-keyed
//! parameter map. Items are `bytes::Bytes` so fan-out clones share the
//! underlying buffers instead of copying them.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use fxhash::FxHashMap;

/// Process-wide request id counter.
static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(0);

/// Routing metadata attached to every request.
#[derive(Debug, Clone, Default)]
pub struct RequestHeader {
    /// Slot identifier tying a response back to the request that produced it.
    pub request_id: u64,
    /// Endpoint inside the downstream node that should handle the request.
    pub exec_endpoint: Option<String>,
    /// Node-selection pattern: exact name or `prefix*` glob. Nodes that do
    /// not match forward the request downstream without processing it.
    pub target_node: Option<String>,
}

/// One inbound request flowing through the topology graph.
///
/// Requests are read-mostly: every fan-out branch receives its own clone of
/// the header and parameter map, while the item buffers are shared read-only.
#[derive(Debug, Clone, Default)]
pub struct DataRequest {
    /// Routing metadata.
    pub header: RequestHeader,
    /// Ordered opaque payload items.
    pub items: Vec<Bytes>,
    /// String-keyed parameters, visible to every node on the path.
    pub parameters: FxHashMap<String, String>,
}

impl DataRequest {
    /// Creates a request carrying the given items, with a fresh request id.
    #[must_use]
    pub fn new(items: Vec<Bytes>) -> Self {
        Self {
            header: RequestHeader {
                request_id: NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed),
                ..RequestHeader::default()
            },
            items,
            parameters: FxHashMap::default(),
        }
    }

    /// Sets the executor endpoint on the header.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.header.exec_endpoint = Some(endpoint.into());
        self
    }

    /// Sets the target-node selection pattern on the header.
    #[must_use]
    pub fn with_target(mut self, pattern: impl Into<String>) -> Self {
        self.header.target_node = Some(pattern.into());
        self
    }

    /// Sets a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Returns the slot id of this request.
    #[must_use]
    pub fn request_id(&self) -> u64 {
        self.header.request_id
    }
}

/// Outcome status of a response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResponseStatus {
    /// The producing branch completed normally.
    #[default]
    Success,
    /// The producing branch failed.
    Error {
        /// Name of the node where the failure originated.
        node: String,
        /// Failure detail.
        message: String,
    },
}

/// One response produced by walking the graph for a request.
#[derive(Debug, Clone, Default)]
pub struct DataResponse {
    /// Slot id of the request this response belongs to.
    pub request_id: u64,
    /// Ordered opaque payload items.
    pub items: Vec<Bytes>,
    /// Parameters accumulated along the path.
    pub parameters: FxHashMap<String, String>,
    /// Branch outcome.
    pub status: ResponseStatus,
}

impl DataResponse {
    /// Wraps an inbound request as a successful response, the form in which
    /// payloads flow between nodes inside the graph walk.
    #[must_use]
    pub fn carrying(request: &DataRequest) -> Self {
        Self {
            request_id: request.header.request_id,
            items: request.items.clone(),
            parameters: request.parameters.clone(),
            status: ResponseStatus::Success,
        }
    }

    /// Creates an error response for the given slot.
    #[must_use]
    pub fn error(request_id: u64, node: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            request_id,
            items: Vec::new(),
            parameters: FxHashMap::default(),
            status: ResponseStatus::Error {
                node: node.into(),
                message: message.into(),
            },
        }
    }

    /// Returns `true` if the response carries an error status.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self.status, ResponseStatus::Error { .. })
    }
}
