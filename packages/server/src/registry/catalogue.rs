//! The handler catalogue: the registration API for handler units.
//!
//! Rust handlers are compiled in, so "loading" a unit means calling the
//! loader registered under its path. Paths use `/` between collection names
//! and end with the component name, e.g. `"sub/sub.one"`.

use std::fmt;
use std::sync::Arc;

use super::Declaration;
use crate::invocable::HandlerUnit;

/// Error a loader may return instead of a unit.
pub type LoadError = Box<dyn std::error::Error + Send + Sync>;

/// Produces the handler unit for one catalogue entry. Called once, at
/// discovery time.
pub type Loader = Arc<dyn Fn() -> Result<HandlerUnit, LoadError> + Send + Sync>;

/// Handler units by path, in registration order.
#[derive(Clone, Default)]
pub struct HandlerCatalogue {
    entries: Vec<(String, Loader)>,
}

impl HandlerCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fallible loader under `path`.
    pub fn register<F>(mut self, path: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> Result<HandlerUnit, LoadError> + Send + Sync + 'static,
    {
        self.entries.push((path.into(), Arc::new(loader)));
        self
    }

    /// Register an infallible unit constructor under `path`.
    pub fn unit<F>(self, path: impl Into<String>, make: F) -> Self
    where
        F: Fn() -> HandlerUnit + Send + Sync + 'static,
    {
        self.register(path, move || Ok(make()))
    }

    /// The loader registered first under `path`.
    pub fn loader(&self, path: &str) -> Option<Loader> {
        self.entries
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, l)| Arc::clone(l))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(p, _)| p.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One component declaration per entry. Intermediate collections are
    /// implied by the paths.
    pub fn declarations(&self) -> Vec<Declaration> {
        self.entries
            .iter()
            .map(|(path, loader)| {
                Declaration::component(
                    path.split('/').map(String::from).collect(),
                    Arc::clone(loader),
                )
            })
            .collect()
    }
}

impl fmt::Debug for HandlerCatalogue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.paths()).finish()
    }
}
