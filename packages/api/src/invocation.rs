//! The request value handed to a component's `invoke`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One invocation of a component. Built per HTTP request and dropped once the
/// response is written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvocationRequest {
    /// The decoded request body, already validated as a non-empty object.
    pub body: Value,

    /// Routing context for the invocation.
    pub metadata: RequestMetadata,
}

/// Routing context attached to an [`InvocationRequest`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RequestMetadata {
    /// Resolved registry path of the component, root first.
    /// Example: `["sub", "sub.one"]`.
    pub component: Vec<String>,

    /// Raw HTTP method, e.g. `"POST"`.
    pub method: String,

    /// Raw request path as seen by the component middleware (relative to
    /// its mount point).
    pub path: String,

    /// Per-request identifier used to correlate log lines.
    pub request_id: String,
}

impl InvocationRequest {
    /// Construct a request for `body` with the given routing context.
    pub fn new(body: Value, metadata: RequestMetadata) -> Self {
        Self { body, metadata }
    }

    /// The component path joined with `/`, as used in log lines.
    pub fn component_path(&self) -> String {
        self.metadata.component.join("/")
    }
}
