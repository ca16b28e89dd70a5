//! Calling a resolved component and shaping the result into an envelope.

use std::sync::Arc;

use serde_json::Value;
use switchyard_api::{Envelope, InvocationRequest};
use tracing::Instrument;

use crate::invocable::Invocable;

/// Minimal shape every invocation body must have: a non-empty JSON object.
pub fn validate_body(body: &Value) -> Result<(), String> {
    match body {
        Value::Object(map) if !map.is_empty() => Ok(()),
        Value::Object(_) => Err("request body must not be empty".into()),
        Value::Null => Err("request body is required".into()),
        _ => Err("request body must be a JSON object".into()),
    }
}

/// Invoke `invocable` in its own task and wrap the outcome.
///
/// A returned [`HandlerError`](crate::invocable::HandlerError) and a panic
/// inside the handler both become an `{error: true}` envelope; neither is
/// surfaced as an HTTP error.
pub async fn invoke(invocable: Arc<dyn Invocable>, request: InvocationRequest) -> Envelope {
    let component = request.component_path();
    let span = tracing::info_span!(
        "invoke",
        component = %component,
        request_id = %request.metadata.request_id,
    );

    let task = tokio::spawn(async move { invocable.invoke(request).await }.instrument(span));

    match task.await {
        Ok(Ok(payload)) => {
            tracing::debug!(component = %component, "invocation succeeded");
            Envelope::success(payload)
        }
        Ok(Err(e)) => {
            tracing::warn!(component = %component, "component reported failure: {e}");
            Envelope::failure(e.message, e.details)
        }
        Err(join) if join.is_panic() => {
            tracing::error!(component = %component, "component panicked during invoke");
            Envelope::failure(format!("component {component} failed unexpectedly"), None)
        }
        Err(join) => {
            tracing::error!(component = %component, "invocation task aborted: {join}");
            Envelope::failure(format!("invocation of {component} was aborted"), None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::invocable::{classify, HandlerError, HandlerResult, HandlerUnit};
    use crate::testing::{invocation, EchoComponent};

    #[test]
    fn body_validation() {
        assert!(validate_body(&json!({ "a": 1 })).is_ok());
        assert!(validate_body(&json!({})).is_err());
        assert!(validate_body(&Value::Null).is_err());
        assert!(validate_body(&json!([1, 2])).is_err());
        assert!(validate_body(&json!("text")).is_err());
    }

    #[tokio::test]
    async fn success_is_wrapped() {
        let invocable = classify(HandlerUnit::instantiable(|| EchoComponent)).unwrap();
        let env = invoke(invocable, invocation(json!({ "foo": "bar" }))).await;
        assert_eq!(env, Envelope::success(json!({ "foo": "bar" })));
    }

    #[tokio::test]
    async fn handler_error_becomes_error_envelope() {
        let unit = HandlerUnit::callable(|_req: InvocationRequest| async {
            HandlerResult::Err(HandlerError::new("no such order"))
        });
        let env = invoke(classify(unit).unwrap(), invocation(json!({ "a": 1 }))).await;
        assert!(env.error);
        assert_eq!(env.payload["message"], "no such order");
    }

    #[tokio::test]
    async fn panic_becomes_error_envelope() {
        let unit = HandlerUnit::callable(|_req: InvocationRequest| async {
            if true {
                panic!("handler blew up");
            }
            HandlerResult::Ok(Value::Null)
        });
        let env = invoke(classify(unit).unwrap(), invocation(json!({ "a": 1 }))).await;
        assert!(env.error);
        assert!(env.payload["message"].as_str().unwrap().contains("failed unexpectedly"));
    }
}
