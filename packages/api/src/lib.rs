//! Request and response types for the Switchyard component protocol.
//!
//! This crate encodes the HTTP contract between callers and a mounted
//! component middleware as Rust types. It has no HTTP dependency so that
//! clients and test suites can share it with the server.
//!
//! # Endpoints covered
//!
//! Paths are relative to the mount point of the component middleware.
//!
//! | Method | Path | Type |
//! |--------|------|------|
//! | GET | `/` | → [`RegistryMetadata`] |
//! | GET | `/{collection}` | → [`RegistryMetadata`] |
//! | POST | `/{component}` | request body → [`Envelope`] |
//! | POST | `/{collection}/{component}` | request body → [`Envelope`] |
//!
//! Every HTTP-level failure (401, 404, 400) carries an [`ErrorResponse`].

pub mod envelope;
pub mod error;
pub mod invocation;
pub mod metadata;

pub use envelope::Envelope;
pub use error::ErrorResponse;
pub use invocation::{InvocationRequest, RequestMetadata};
pub use metadata::{ComponentMetadata, NodeKind, NodeSummary, RegistryMetadata};
