//! Public surface for the `switchyard` crate.
//!
//! Exposes the middleware facade, the registry and the component
//! conventions so that an embedding application (or the conformance suite)
//! can mount component routing on its own axum router.

use std::any::Any;

pub mod builtin;
pub mod config;
pub mod error;
pub mod invocable;
pub mod invocation;
pub mod middleware;
pub mod registry;
pub mod router;
pub mod testing;

pub use config::{MiddlewareOptions, ServerConfig};
pub use invocable::{Component, HandlerError, HandlerResult, HandlerUnit};
pub use middleware::{middleware, MiddlewareStack};
pub use registry::{HandlerCatalogue, Registry};
pub use router::build_app;

/// Version reported in metadata listings.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
