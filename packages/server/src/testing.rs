//! Helpers for exercising components without a live conversation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use switchyard_api::{ComponentMetadata, InvocationRequest, RequestMetadata};

use crate::invocable::{Component, HandlerResult};

/// A representative invocation body, as a bot platform would send it.
pub fn mock_request() -> Value {
    json!({
        "botId": "mock-bot",
        "platformVersion": "1.1",
        "context": {
            "variables": {
                "user.name": { "type": "string", "entityName": null, "value": "Ada" }
            }
        },
        "properties": { "greeting": "hello" },
        "message": {
            "payload": { "text": "hello there" },
            "channelConversation": { "type": "test", "userId": "user-1" }
        }
    })
}

/// An [`InvocationRequest`] for `body`, addressed to a component named `mock`.
pub fn invocation(body: Value) -> InvocationRequest {
    InvocationRequest::new(
        body,
        RequestMetadata {
            component: vec!["mock".into()],
            method: "POST".into(),
            path: "/mock".into(),
            request_id: "test-request".into(),
        },
    )
}

/// Returns the request body unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoComponent;

#[async_trait]
impl Component for EchoComponent {
    fn metadata(&self) -> ComponentMetadata {
        ComponentMetadata::default().action("echo")
    }

    async fn invoke(&mut self, request: InvocationRequest) -> HandlerResult {
        Ok(request.body)
    }
}

/// Counts its invocations into a shared counter and reports the running total.
#[derive(Debug, Clone)]
pub struct CountingComponent {
    calls: Arc<AtomicUsize>,
}

impl CountingComponent {
    pub fn new(calls: Arc<AtomicUsize>) -> Self {
        Self { calls }
    }
}

#[async_trait]
impl Component for CountingComponent {
    async fn invoke(&mut self, request: InvocationRequest) -> HandlerResult {
        let count = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(json!({ "count": count, "component": request.component_path() }))
    }
}
