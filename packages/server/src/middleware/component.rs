//! The component middleware: routes requests below its mount point onto the
//! registry.
//!
//! | Method | Path | Result |
//! |--------|------|--------|
//! | GET | `/` | root metadata |
//! | GET | `/{collection}` | collection metadata |
//! | POST | `/{component}` | invocation envelope |
//! | POST | `/{collection}/{component}` | invocation envelope |
//!
//! Paths resolve through the whole tree, so `GET /a/b` lists the nested
//! collection `a/b` and `POST /a/b/c` invokes the component below it.
//! A request that does not resolve to the right kind of node is handed to
//! the next step; mounted with [`into_router`](super::MiddlewareStack::into_router)
//! that is a 404. Authentication is not checked here.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::Request,
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use switchyard_api::{InvocationRequest, RequestMetadata};

use super::lifecycle::{InitError, MiddlewareStep};
use super::parser::{parse_request, ParsedBody};
use crate::config::{ComponentOptions, DEFAULT_BODY_LIMIT};
use crate::error::AppError;
use crate::invocation::{invoke, validate_body};
use crate::registry::{Collection, ComponentNode, Registry, RegistryNode};

/// Initialized component router over an immutable registry.
pub struct ComponentMiddleware {
    registry: Arc<Registry>,
}

/// Where a request path leads.
enum Route<'a> {
    Metadata(&'a Collection),
    Invoke(&'a ComponentNode),
    NotFound,
}

impl ComponentMiddleware {
    /// Guarded initializer: builds the registry from the configured handler
    /// source. `root` is the base for a relative `baseDir`.
    pub fn init(options: ComponentOptions, root: Option<&Path>) -> Result<Self, InitError> {
        let discovered = match options.resolve_base_dir(root) {
            Some(dir) => {
                tracing::info!("components: discovering from {}", dir.display());
                Registry::discover(&dir, &options.catalogue)?
            }
            None => {
                tracing::info!(
                    "components: building from catalogue ({} entries)",
                    options.catalogue.len()
                );
                Registry::from_catalogue(&options.catalogue)
            }
        };
        tracing::info!(
            "components: registry ready ({} components, {} skipped)",
            discovered.registry.component_count(),
            discovered.failures.len()
        );
        Ok(Self::new(discovered.registry))
    }

    pub fn new(registry: Registry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    fn route<'a>(&'a self, method: &Method, segments: &[String]) -> Route<'a> {
        let node = self.registry.resolve(segments);
        if *method == Method::GET {
            match node {
                _ if segments.is_empty() => Route::Metadata(self.registry.root()),
                Some(RegistryNode::Collection(c)) => Route::Metadata(c),
                _ => Route::NotFound,
            }
        } else if *method == Method::POST {
            match node {
                Some(RegistryNode::Component(c)) => Route::Invoke(c),
                _ => Route::NotFound,
            }
        } else {
            Route::NotFound
        }
    }

    async fn dispatch(&self, component: &ComponentNode, req: Request, path: String) -> Response {
        let method = req.method().to_string();
        let parsed = req.extensions().get::<ParsedBody>().map(|p| p.0.clone());
        let body = match parsed {
            Some(body) => body,
            // No parser mounted ahead of us: decode here with the default limit.
            None => match parse_request(req, DEFAULT_BODY_LIMIT).await {
                Ok((_, body)) => body,
                Err(e) => return e.into_response(),
            },
        };

        if let Err(reason) = validate_body(&body) {
            tracing::debug!("components: rejected body for {path}: {reason}");
            return AppError::BadRequest(reason).into_response();
        }

        let request = InvocationRequest::new(
            body,
            RequestMetadata {
                component: component.path().to_vec(),
                method,
                path,
                request_id: uuid::Uuid::now_v7().to_string(),
            },
        );
        Json(invoke(component.invocable(), request).await).into_response()
    }
}

#[async_trait]
impl MiddlewareStep for ComponentMiddleware {
    async fn handle(&self, req: Request, next: Next) -> Response {
        let path = req.uri().path().to_string();
        let Some(segments) = split_path(&path) else {
            return next.run(req).await;
        };

        match self.route(req.method(), &segments) {
            Route::Metadata(collection) => Json(collection.metadata()).into_response(),
            Route::Invoke(component) => self.dispatch(component, req, path).await,
            Route::NotFound => {
                tracing::debug!("components: no route for {} {path}", req.method());
                next.run(req).await
            }
        }
    }
}

/// Percent-decoded, non-empty path segments. `None` if a segment does not
/// decode to UTF-8.
fn split_path(path: &str) -> Option<Vec<String>> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| urlencoding::decode(s).ok().map(|d| d.into_owned()))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
