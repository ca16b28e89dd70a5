//! Standard error response body for HTTP-level failures.

use serde::{Deserialize, Serialize};

/// The JSON body returned for 400, 401, 404, 413 and 500 responses.
///
/// Handler failures are not reported this way; they travel inside an
/// [`Envelope`](crate::Envelope) with a 200 status.
///
/// ```json
/// { "error": "no component at /foo", "code": "not_found" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Human-readable description of the problem.
    pub error: String,

    /// Machine-readable error code.
    ///
    /// | `code` | HTTP status |
    /// |--------|------------|
    /// | `invalid_body` | 400 |
    /// | `unauthorized` | 401 |
    /// | `not_found` | 404 |
    /// | `payload_too_large` | 413 |
    /// | `internal_error` | 500 |
    pub code: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            error: error.into(),
        }
    }
}

/// Well-known error codes.
pub mod codes {
    pub const INVALID_BODY: &str = "invalid_body";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const NOT_FOUND: &str = "not_found";
    pub const PAYLOAD_TOO_LARGE: &str = "payload_too_large";
    pub const INTERNAL_ERROR: &str = "internal_error";
}
