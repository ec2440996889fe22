//! Per-node filter conditions.
//!
//! A condition is a predicate over request content evaluated before a node
//! is called. When it evaluates to `false` the branch is pruned and
//! contributes no response.

use std::fmt;
use std::sync::Arc;

use crate::request::DataRequest;

/// Custom predicate type.
pub type ConditionFn = Arc<dyn Fn(&DataRequest) -> bool + Send + Sync>;

/// A filter condition attached to a node at construction time.
#[derive(Clone)]
pub enum FilterCondition {
    /// Passes when the parameter `key` equals `value`.
    ParamEquals {
        /// Parameter key to look up.
        key: String,
        /// Required value.
        value: String,
    },
    /// Passes when the parameter `key` is present.
    ParamExists {
        /// Parameter key to look up.
        key: String,
    },
    /// Custom predicate over the full request.
    Custom(ConditionFn),
}

impl FilterCondition {
    /// Evaluates the condition against a request.
    #[must_use]
    pub fn evaluate(&self, request: &DataRequest) -> bool {
        match self {
            Self::ParamEquals { key, value } => {
                request.parameters.get(key).is_some_and(|v| v == value)
            }
            Self::ParamExists { key } => request.parameters.contains_key(key),
            Self::Custom(f) => f(request),
        }
    }
}

impl fmt::Debug for FilterCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParamEquals { key, value } => write!(f, "ParamEquals({key}={value})"),
            Self::ParamExists { key } => write!(f, "ParamExists({key})"),
            Self::Custom(_) => write!(f, "Custom(...)"),
        }
    }
}
