//! The lifecycle every middleware kind goes through.
//!
//! [`extend`] takes a configuration and an initializer, runs the initializer
//! exactly once inside a failure boundary, and hands back a
//! [`MiddlewareHandler`]. When the initializer returns an error or panics,
//! the failure is logged and the handler becomes a pass-through that
//! forwards every request to the next step. Server startup never fails
//! because of one middleware.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::Request,
    middleware::{from_fn, Next},
    response::Response,
    Router,
};

use crate::panic_message;
use crate::registry::DiscoveryError;

/// Why a middleware could not initialize.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("component discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("initializer panicked: {0}")]
    Panicked(String),
}

/// One initialized middleware kind, driven per request.
#[async_trait]
pub trait MiddlewareStep: Send + Sync + 'static {
    /// Handle `req`, either answering it or passing it on via `next`.
    async fn handle(&self, req: Request, next: Next) -> Response;
}

/// A middleware after its lifecycle has run. Cheap to clone.
#[derive(Clone)]
pub struct MiddlewareHandler {
    name: &'static str,
    step: Option<Arc<dyn MiddlewareStep>>,
    failure: Option<Arc<str>>,
}

impl MiddlewareHandler {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// `false` when initialization failed and the handler passes requests through.
    pub fn is_active(&self) -> bool {
        self.step.is_some()
    }

    /// The contained initialization failure, if any.
    pub fn init_failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Run the step for one request.
    pub async fn run(&self, req: Request, next: Next) -> Response {
        match &self.step {
            Some(step) => step.handle(req, next).await,
            None => next.run(req).await,
        }
    }

    /// Apply this handler to every route (and fallback) already on `router`.
    pub fn layer_onto(self, router: Router) -> Router {
        router.layer(from_fn(move |req: Request, next: Next| {
            let handler = self.clone();
            async move { handler.run(req, next).await }
        }))
    }

    fn degraded(name: &'static str, error: InitError) -> Self {
        tracing::error!(
            middleware = name,
            "initialization failed, continuing as pass-through: {error}"
        );
        Self {
            name,
            step: None,
            failure: Some(error.to_string().into()),
        }
    }
}

/// Construct a middleware from `config`, running `init` inside a failure
/// boundary. Never fails.
pub fn extend<C, S, F>(name: &'static str, config: C, init: F) -> MiddlewareHandler
where
    S: MiddlewareStep,
    F: FnOnce(C) -> Result<S, InitError>,
{
    match panic::catch_unwind(AssertUnwindSafe(move || init(config))) {
        Ok(Ok(step)) => {
            tracing::info!(middleware = name, "initialized");
            MiddlewareHandler {
                name,
                step: Some(Arc::new(step)),
                failure: None,
            }
        }
        Ok(Err(e)) => MiddlewareHandler::degraded(name, e),
        Err(payload) => MiddlewareHandler::degraded(
            name,
            InitError::Panicked(panic_message(payload.as_ref())),
        ),
    }
}
