//! Shared helpers for the switchyard conformance test suite.
//!
//! Provides [`spawn_server`], which binds a `TcpListener` on an ephemeral
//! port and serves the demo application over a discovered handler directory:
//!
//! ```text
//! <tempdir>/
//!   legacy.style.rs     callable component
//!   sub/
//!     sub.one.rs        instantiable component, echoes its body
//!   test.one.rs         instantiable component
//! ```
//!
//! The two top-level components count their invocations into [`Spies`] so
//! tests can assert that `invoke` ran exactly once per request.

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use switchyard::config::{Credentials, ServerConfig};
use switchyard::testing::EchoComponent;
use switchyard::{build_app, Component, HandlerCatalogue, HandlerResult, HandlerUnit};
use switchyard_api::{ComponentMetadata, InvocationRequest};

/// Basic auth user the spawned server accepts.
pub const USER: &str = "conformance";
/// Basic auth password the spawned server accepts.
pub const PASS: &str = "s3cret";
/// Mount point of the component router.
pub const PREFIX: &str = "/components";

/// Invocation counters for the fixture components.
#[derive(Debug, Clone, Default)]
pub struct Spies {
    pub modern: Arc<AtomicUsize>,
    pub legacy: Arc<AtomicUsize>,
}

impl Spies {
    pub fn modern_calls(&self) -> usize {
        self.modern.load(Ordering::SeqCst)
    }

    pub fn legacy_calls(&self) -> usize {
        self.legacy.load(Ordering::SeqCst)
    }
}

/// The instantiable fixture component.
struct MyFirstComponent {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Component for MyFirstComponent {
    fn metadata(&self) -> ComponentMetadata {
        ComponentMetadata::default()
            .property("botId", json!({ "type": "string" }))
            .action("next")
    }

    async fn invoke(&mut self, request: InvocationRequest) -> HandlerResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({
            "botId": request.body.get("botId").cloned(),
            "action": "next",
        }))
    }
}

fn catalogue(spies: &Spies) -> HandlerCatalogue {
    let modern = Arc::clone(&spies.modern);
    let legacy = Arc::clone(&spies.legacy);
    HandlerCatalogue::new()
        .unit("test.one", move || {
            let calls = Arc::clone(&modern);
            HandlerUnit::instantiable(move || MyFirstComponent {
                calls: Arc::clone(&calls),
            })
        })
        .unit("legacy.style", move || {
            let calls = Arc::clone(&legacy);
            HandlerUnit::callable(move |req: InvocationRequest| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { HandlerResult::Ok(json!({ "received": req.body })) }
            })
        })
        .unit("sub/sub.one", || HandlerUnit::instantiable(|| EchoComponent))
}

/// Start an ephemeral in-process server and return `(base_url, spies)`.
///
/// The server runs in a background `tokio` task bound to an OS-assigned port
/// on `127.0.0.1`. The returned URL has no trailing slash, e.g.
/// `http://127.0.0.1:51234`.
///
/// # Panics
///
/// Panics if the fixture directory or the TCP listener cannot be created.
pub async fn spawn_server() -> (String, Spies) {
    let dir = tempfile::tempdir().expect("create fixture dir");
    fs::create_dir(dir.path().join("sub")).expect("create sub collection");
    for file in ["test.one.rs", "legacy.style.rs", "sub/sub.one.rs"] {
        fs::write(dir.path().join(file), "").expect("write fixture file");
    }

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("get local addr");

    let config = ServerConfig {
        bind_addr: addr,
        prefix: PREFIX.into(),
        credentials: Some(Credentials {
            user: USER.into(),
            pass: PASS.into(),
        }),
        component_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    };
    let spies = Spies::default();
    // Discovery runs here; the directory is not needed afterwards.
    let router = build_app(&config, catalogue(&spies));
    drop(dir);

    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("conformance server error");
    });

    (format!("http://{addr}"), spies)
}
