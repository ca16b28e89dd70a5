//! The invocation response envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The JSON body returned for every component invocation that reached the
/// handler, whether it succeeded or failed.
///
/// ```json
/// { "error": false, "payload": { "reply": "hello" } }
/// ```
///
/// A handler-level failure is reported inside the body with `error: true`
/// and a description in `payload`; the HTTP status stays 200 so callers can
/// always parse the response the same way.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    /// `true` when the handler failed.
    pub error: bool,

    /// The handler result, or a failure description when `error` is set.
    pub payload: Value,
}

impl Envelope {
    /// Wrap a successful handler result.
    pub fn success(payload: Value) -> Self {
        Self {
            error: false,
            payload,
        }
    }

    /// Wrap a handler failure. The payload is `{ "message": ... }`, extended
    /// with `details` when the handler supplied any.
    pub fn failure(message: impl Into<String>, details: Option<Value>) -> Self {
        let mut payload = serde_json::Map::new();
        payload.insert("message".into(), Value::String(message.into()));
        if let Some(details) = details {
            payload.insert("details".into(), details);
        }
        Self {
            error: true,
            payload: Value::Object(payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_serialises_flat() {
        let env = Envelope::success(json!({ "reply": "hi" }));
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value, json!({ "error": false, "payload": { "reply": "hi" } }));
    }

    #[test]
    fn failure_carries_message_and_details() {
        let env = Envelope::failure("boom", Some(json!({ "step": 2 })));
        assert!(env.error);
        assert_eq!(env.payload["message"], "boom");
        assert_eq!(env.payload["details"]["step"], 2);
    }

    #[test]
    fn failure_without_details_omits_key() {
        let env = Envelope::failure("boom", None);
        assert!(env.payload.get("details").is_none());
    }
}
