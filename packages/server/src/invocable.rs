//! Handler units and the adapters that make them invocable.
//!
//! A component author supplies a [`HandlerUnit`] in one of two shapes:
//!
//! - **Instantiable**: a factory for a type implementing [`Component`]. A
//!   fresh instance is built for every request, so per-instance state never
//!   leaks between requests.
//! - **Callable**: a plain `invoke` function with no instance behind it.
//!   This is the legacy convention.
//!
//! [`classify`] looks at a unit once, at discovery time, and returns an
//! [`Invocable`] adapter. The router only ever talks to that trait.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use switchyard_api::{ComponentMetadata, InvocationRequest};

/// A failure reported by a component. Travels back to the caller inside an
/// `{error: true}` envelope.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct HandlerError {
    pub message: String,
    pub details: Option<Value>,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
        }
    }

    /// Attach structured details to the failure.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// What a component returns from `invoke`.
pub type HandlerResult = Result<Value, HandlerError>;

/// Boxed future returned by callable (legacy) handlers.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

type Factory = Arc<dyn Fn() -> Box<dyn Component> + Send + Sync>;
type StaticInvoke = Arc<dyn Fn(InvocationRequest) -> BoxFuture<HandlerResult> + Send + Sync>;

// ---------------------------------------------------------------------------
// Modern convention
// ---------------------------------------------------------------------------

/// An instantiable component.
///
/// `invoke` takes `&mut self`: the instance belongs to exactly one request.
#[async_trait]
pub trait Component: Send + Sync {
    /// Self-description shown in metadata listings.
    fn metadata(&self) -> ComponentMetadata {
        ComponentMetadata::default()
    }

    async fn invoke(&mut self, request: InvocationRequest) -> HandlerResult;
}

// ---------------------------------------------------------------------------
// HandlerUnit
// ---------------------------------------------------------------------------

/// A loaded handler unit, before its calling convention is known.
///
/// A unit may expose a factory, a static `invoke`, both, or (when
/// misconfigured) neither. [`classify`] decides which one is used.
#[derive(Clone, Default)]
pub struct HandlerUnit {
    factory: Option<Factory>,
    invoke: Option<StaticInvoke>,
    metadata: Option<ComponentMetadata>,
}

impl HandlerUnit {
    /// A unit whose component is built by `factory` for every request.
    pub fn instantiable<C, F>(factory: F) -> Self
    where
        C: Component + 'static,
        F: Fn() -> C + Send + Sync + 'static,
    {
        Self::default().with_factory(factory)
    }

    /// A legacy unit exposing a static `invoke`.
    pub fn callable<F, Fut>(invoke: F) -> Self
    where
        F: Fn(InvocationRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self::default().with_callable(invoke)
    }

    pub fn with_factory<C, F>(mut self, factory: F) -> Self
    where
        C: Component + 'static,
        F: Fn() -> C + Send + Sync + 'static,
    {
        self.factory = Some(Arc::new(move || Box::new(factory()) as Box<dyn Component>));
        self
    }

    pub fn with_callable<F, Fut>(mut self, invoke: F) -> Self
    where
        F: Fn(InvocationRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.invoke = Some(Arc::new(move |req| Box::pin(invoke(req)) as BoxFuture<HandlerResult>));
        self
    }

    /// Static metadata. Overrides what an instantiable component reports.
    pub fn with_metadata(mut self, metadata: ComponentMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

impl fmt::Debug for HandlerUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerUnit")
            .field("instantiable", &self.factory.is_some())
            .field("callable", &self.invoke.is_some())
            .field("metadata", &self.metadata)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Invocable
// ---------------------------------------------------------------------------

/// Which calling convention a unit was classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convention {
    /// Instantiable component, one instance per request.
    Modern,
    /// Static `invoke`, no instance.
    Legacy,
}

/// The single call contract the router uses for every component.
#[async_trait]
pub trait Invocable: Send + Sync {
    fn convention(&self) -> Convention;

    fn metadata(&self) -> &ComponentMetadata;

    async fn invoke(&self, request: InvocationRequest) -> HandlerResult;
}

struct InstanceAdapter {
    factory: Factory,
    metadata: ComponentMetadata,
}

#[async_trait]
impl Invocable for InstanceAdapter {
    fn convention(&self) -> Convention {
        Convention::Modern
    }

    fn metadata(&self) -> &ComponentMetadata {
        &self.metadata
    }

    async fn invoke(&self, request: InvocationRequest) -> HandlerResult {
        let mut instance = (self.factory)();
        instance.invoke(request).await
    }
}

struct StaticAdapter {
    invoke: StaticInvoke,
    metadata: ComponentMetadata,
}

#[async_trait]
impl Invocable for StaticAdapter {
    fn convention(&self) -> Convention {
        Convention::Legacy
    }

    fn metadata(&self) -> &ComponentMetadata {
        &self.metadata
    }

    async fn invoke(&self, request: InvocationRequest) -> HandlerResult {
        (self.invoke)(request).await
    }
}

/// Pick the calling convention for `unit` and wrap it.
///
/// Instantiable wins over callable. Returns `None` when the unit exposes
/// neither. For an instantiable unit without static metadata, one instance
/// is built here to read its [`Component::metadata`].
pub fn classify(unit: HandlerUnit) -> Option<Arc<dyn Invocable>> {
    let HandlerUnit {
        factory,
        invoke,
        metadata,
    } = unit;

    if let Some(factory) = factory {
        let metadata = metadata.unwrap_or_else(|| factory().metadata());
        return Some(Arc::new(InstanceAdapter { factory, metadata }));
    }

    invoke.map(|invoke| {
        Arc::new(StaticAdapter {
            invoke,
            metadata: metadata.unwrap_or_default(),
        }) as Arc<dyn Invocable>
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
