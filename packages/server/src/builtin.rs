//! The components compiled into the `switchyard` binary.
//!
//! | Path | Convention | Behaviour |
//! |------|------------|-----------|
//! | `hello` | instantiable | greets `name` (default `"world"`), action `next` |
//! | `echo` | callable | returns the body unchanged |
//! | `text/uppercase` | instantiable | upper-cases `text` |
//! | `text/reverse` | callable | reverses `text` |

use async_trait::async_trait;
use serde_json::{json, Value};
use switchyard_api::{ComponentMetadata, InvocationRequest};

use crate::invocable::{Component, HandlerError, HandlerResult, HandlerUnit};
use crate::registry::HandlerCatalogue;

/// Catalogue of the built-in components.
pub fn catalogue() -> HandlerCatalogue {
    HandlerCatalogue::new()
        .unit("hello", || HandlerUnit::instantiable(|| Hello))
        .unit("echo", || {
            HandlerUnit::callable(|req: InvocationRequest| async move { HandlerResult::Ok(req.body) })
                .with_metadata(ComponentMetadata::default().action("echo"))
        })
        .unit("text/uppercase", || HandlerUnit::instantiable(|| Uppercase))
        .unit("text/reverse", || {
            HandlerUnit::callable(|req: InvocationRequest| async move {
                let reversed: String = text_field(&req.body)?.chars().rev().collect();
                HandlerResult::Ok(json!({ "text": reversed }))
            })
            .with_metadata(text_metadata())
        })
}

struct Hello;

#[async_trait]
impl Component for Hello {
    fn metadata(&self) -> ComponentMetadata {
        ComponentMetadata::default()
            .property("name", json!({ "type": "string", "required": false }))
            .action("next")
    }

    async fn invoke(&mut self, request: InvocationRequest) -> HandlerResult {
        let name = request
            .body
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("world");
        Ok(json!({ "greeting": format!("Hello, {name}!"), "action": "next" }))
    }
}

struct Uppercase;

#[async_trait]
impl Component for Uppercase {
    fn metadata(&self) -> ComponentMetadata {
        text_metadata()
    }

    async fn invoke(&mut self, request: InvocationRequest) -> HandlerResult {
        let text = text_field(&request.body)?;
        Ok(json!({ "text": text.to_uppercase() }))
    }
}

fn text_metadata() -> ComponentMetadata {
    ComponentMetadata::default().property("text", json!({ "type": "string", "required": true }))
}

fn text_field(body: &Value) -> Result<&str, HandlerError> {
    body.get("text").and_then(Value::as_str).ok_or_else(|| {
        HandlerError::new("missing property: text").with_details(json!({ "property": "text" }))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Registry, RegistryNode};
    use crate::testing::invocation;

    fn invocable(path: &[&str]) -> std::sync::Arc<dyn crate::invocable::Invocable> {
        let discovered = Registry::from_catalogue(&catalogue());
        assert!(discovered.failures.is_empty());
        match discovered.registry.resolve(path) {
            Some(RegistryNode::Component(c)) => c.invocable(),
            _ => panic!("{path:?} is not a component"),
        }
    }

    #[tokio::test]
    async fn hello_defaults_to_world() {
        let out = invocable(&["hello"])
            .invoke(invocation(json!({ "x": 1 })))
            .await
            .unwrap();
        assert_eq!(out["greeting"], "Hello, world!");
        let out = invocable(&["hello"])
            .invoke(invocation(json!({ "name": "Ada" })))
            .await
            .unwrap();
        assert_eq!(out["greeting"], "Hello, Ada!");
    }

    #[tokio::test]
    async fn text_components() {
        let body = json!({ "text": "abc" });
        let up = invocable(&["text", "uppercase"]).invoke(invocation(body.clone())).await;
        assert_eq!(up.unwrap()["text"], "ABC");
        let rev = invocable(&["text", "reverse"]).invoke(invocation(body)).await;
        assert_eq!(rev.unwrap()["text"], "cba");
    }

    #[tokio::test]
    async fn missing_text_is_a_handler_error() {
        let err = invocable(&["text", "uppercase"])
            .invoke(invocation(json!({ "other": 1 })))
            .await
            .unwrap_err();
        assert_eq!(err.message, "missing property: text");
        assert_eq!(err.details, Some(json!({ "property": "text" })));
    }
}
