//! The component registry: an immutable tree of collections and components.
//!
//! A registry is built once, before the middleware serves any request, from
//! a list of [`Declaration`]s. Declarations come from one of two producers:
//!
//! | Producer | When |
//! |----------|------|
//! | [`discovery::scan`] | `component.baseDir` is configured; the directory layout defines the tree |
//! | [`HandlerCatalogue::declarations`] | no directory; the catalogue's paths define the tree |
//!
//! Building never fails as a whole. A declaration that cannot be placed (a
//! duplicate name, a unit that does not load) is logged, recorded in
//! [`Discovered::failures`] and skipped; its siblings are unaffected.

pub mod catalogue;
pub mod discovery;

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use switchyard_api::{NodeSummary, RegistryMetadata};

use crate::invocable::{classify, Convention, Invocable};
use crate::panic_message;

pub use catalogue::{HandlerCatalogue, LoadError, Loader};

// ---------------------------------------------------------------------------
// DiscoveryError
// ---------------------------------------------------------------------------

/// Why a handler unit or collection was left out of the registry.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// The handler source location itself is unusable. Fatal to the build.
    #[error("handler source {0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid entry name {0:?}")]
    InvalidName(String),

    #[error("no handler registered for {0}")]
    Unregistered(String),

    #[error("failed to load {path}: {reason}")]
    LoadFailed { path: String, reason: String },

    #[error("{0} does not expose an invoke operation")]
    NotInvocable(String),

    #[error("{0} is already registered; later entry skipped")]
    Duplicate(String),

    #[error("{0} is a component and cannot contain other entries")]
    NotACollection(String),
}

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

/// One unit of the handler source: where it lives and what it is.
#[derive(Clone)]
pub struct Declaration {
    /// Names from the root to this entry. Must not be empty.
    pub path: Vec<String>,
    pub kind: DeclarationKind,
}

#[derive(Clone)]
pub enum DeclarationKind {
    Collection,
    Component(Loader),
}

impl Declaration {
    pub fn collection(path: Vec<String>) -> Self {
        Self {
            path,
            kind: DeclarationKind::Collection,
        }
    }

    pub fn component(path: Vec<String>, loader: Loader) -> Self {
        Self {
            path,
            kind: DeclarationKind::Component(loader),
        }
    }
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// A node of the registry tree.
pub enum RegistryNode {
    Component(ComponentNode),
    Collection(Collection),
}

impl RegistryNode {
    pub fn name(&self) -> &str {
        match self {
            RegistryNode::Component(c) => &c.name,
            RegistryNode::Collection(c) => &c.name,
        }
    }

    pub fn path(&self) -> &[String] {
        match self {
            RegistryNode::Component(c) => &c.path,
            RegistryNode::Collection(c) => &c.path,
        }
    }

    fn summary(&self) -> NodeSummary {
        match self {
            RegistryNode::Component(c) => {
                NodeSummary::component(&c.name, c.invocable.metadata().clone())
            }
            RegistryNode::Collection(c) => NodeSummary::collection(&c.name),
        }
    }
}

/// A leaf: a named handler with its adapter, classified once at load time.
pub struct ComponentNode {
    name: String,
    path: Vec<String>,
    invocable: Arc<dyn Invocable>,
}

impl ComponentNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn convention(&self) -> Convention {
        self.invocable.convention()
    }

    /// Shared handle to the adapter, for moving into an invocation task.
    pub fn invocable(&self) -> Arc<dyn Invocable> {
        Arc::clone(&self.invocable)
    }

    fn load(path: &[String], loader: &Loader) -> Result<Self, DiscoveryError> {
        let display = path.join("/");
        let loaded = panic::catch_unwind(AssertUnwindSafe(|| loader().map(classify)));
        let invocable = match loaded {
            Ok(Ok(Some(invocable))) => invocable,
            Ok(Ok(None)) => return Err(DiscoveryError::NotInvocable(display)),
            Ok(Err(e)) => {
                return Err(DiscoveryError::LoadFailed {
                    path: display,
                    reason: e.to_string(),
                })
            }
            Err(payload) => {
                return Err(DiscoveryError::LoadFailed {
                    path: display,
                    reason: format!("loader panicked: {}", panic_message(payload.as_ref())),
                })
            }
        };
        Ok(Self {
            name: path.last().cloned().unwrap_or_default(),
            path: path.to_vec(),
            invocable,
        })
    }
}

/// An interior node: named children in discovery order.
pub struct Collection {
    name: String,
    path: Vec<String>,
    children: Vec<RegistryNode>,
}

impl Collection {
    fn new(name: impl Into<String>, path: Vec<String>) -> Self {
        Self {
            name: name.into(),
            path,
            children: Vec::new(),
        }
    }

    /// Empty for the root collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn children(&self) -> &[RegistryNode] {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Direct child by exact (case-sensitive) name.
    pub fn get(&self, name: &str) -> Option<&RegistryNode> {
        self.children.iter().find(|c| c.name() == name)
    }

    /// Direct child collection by name.
    pub fn collection(&self, name: &str) -> Option<&Collection> {
        match self.get(name)? {
            RegistryNode::Collection(c) => Some(c),
            RegistryNode::Component(_) => None,
        }
    }

    /// Direct child component by name.
    pub fn component(&self, name: &str) -> Option<&ComponentNode> {
        match self.get(name)? {
            RegistryNode::Component(c) => Some(c),
            RegistryNode::Collection(_) => None,
        }
    }

    /// The metadata listing for this collection's direct children.
    pub fn metadata(&self) -> RegistryMetadata {
        RegistryMetadata {
            version: crate::VERSION.to_string(),
            components: self.children.iter().map(RegistryNode::summary).collect(),
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.children.iter().position(|c| c.name() == name)
    }

    /// Place `decl` below this collection, creating missing intermediate
    /// collections on the way. Nothing is created unless the entry itself
    /// is placed.
    fn place(&mut self, decl: Declaration) -> Result<(), DiscoveryError> {
        let display = decl.path.join("/");
        if decl.path.iter().any(String::is_empty) {
            return Err(DiscoveryError::InvalidName(display));
        }
        let Some((leaf, parents)) = decl.path.split_last() else {
            return Err(DiscoveryError::InvalidName(display));
        };

        let mut existing = Some(&*self);
        for (depth, segment) in parents.iter().enumerate() {
            existing = match existing.and_then(|c| c.get(segment)) {
                Some(RegistryNode::Collection(c)) => Some(c),
                Some(RegistryNode::Component(_)) => {
                    return Err(DiscoveryError::NotACollection(decl.path[..=depth].join("/")))
                }
                None => None,
            };
        }
        match (existing.and_then(|c| c.get(leaf)), &decl.kind) {
            // An auto-created collection being declared explicitly is the same node.
            (Some(RegistryNode::Collection(_)), DeclarationKind::Collection) => return Ok(()),
            (Some(_), _) => return Err(DiscoveryError::Duplicate(display)),
            (None, _) => {}
        }

        let node = match &decl.kind {
            DeclarationKind::Collection => {
                RegistryNode::Collection(Collection::new(leaf, decl.path.clone()))
            }
            DeclarationKind::Component(loader) => {
                RegistryNode::Component(ComponentNode::load(&decl.path, loader)?)
            }
        };

        let mut current = self;
        for (depth, segment) in parents.iter().enumerate() {
            let index = match current.position(segment) {
                Some(i) => i,
                None => {
                    let path = decl.path[..=depth].to_vec();
                    current
                        .children
                        .push(RegistryNode::Collection(Collection::new(segment, path)));
                    current.children.len() - 1
                }
            };
            current = match &mut current.children[index] {
                RegistryNode::Collection(c) => c,
                RegistryNode::Component(_) => {
                    return Err(DiscoveryError::NotACollection(decl.path[..=depth].join("/")))
                }
            };
        }
        current.children.push(node);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// The immutable routing tree. Shared read-only by all requests.
pub struct Registry {
    root: Collection,
}

/// A freshly built registry plus everything that was skipped on the way.
pub struct Discovered {
    pub registry: Registry,
    pub failures: Vec<DiscoveryError>,
}

impl Registry {
    /// Build a registry from declarations, in order. First registration of a
    /// name wins; later collisions are reported and skipped.
    pub fn from_declarations(declarations: impl IntoIterator<Item = Declaration>) -> Discovered {
        let mut root = Collection::new("", Vec::new());
        let mut failures = Vec::new();
        for decl in declarations {
            if let Err(e) = root.place(decl) {
                tracing::warn!("registry: skipped entry: {e}");
                failures.push(e);
            }
        }
        Discovered {
            registry: Registry { root },
            failures,
        }
    }

    /// Build a registry whose shape is given by the catalogue's paths.
    pub fn from_catalogue(catalogue: &HandlerCatalogue) -> Discovered {
        Self::from_declarations(catalogue.declarations())
    }

    /// Walk `base_dir` and resolve each file against `catalogue`.
    ///
    /// Only an unusable `base_dir` is an error; problems with individual
    /// entries end up in [`Discovered::failures`].
    pub fn discover(
        base_dir: &Path,
        catalogue: &HandlerCatalogue,
    ) -> Result<Discovered, DiscoveryError> {
        let scanned = discovery::scan(base_dir, catalogue)?;
        for e in &scanned.failures {
            tracing::warn!("registry: skipped entry: {e}");
        }
        let mut discovered = Self::from_declarations(scanned.declarations);
        let mut failures = scanned.failures;
        failures.append(&mut discovered.failures);
        discovered.failures = failures;
        Ok(discovered)
    }

    pub fn root(&self) -> &Collection {
        &self.root
    }

    /// Look up a node by its full path. An empty path yields `None`; use
    /// [`Registry::root`] for the root.
    pub fn resolve<S: AsRef<str>>(&self, path: &[S]) -> Option<&RegistryNode> {
        let (last, parents) = path.split_last()?;
        let mut current = &self.root;
        for segment in parents {
            current = current.collection(segment.as_ref())?;
        }
        current.get(last.as_ref())
    }

    /// Number of components anywhere in the tree.
    pub fn component_count(&self) -> usize {
        fn count(c: &Collection) -> usize {
            c.children
                .iter()
                .map(|n| match n {
                    RegistryNode::Component(_) => 1,
                    RegistryNode::Collection(inner) => count(inner),
                })
                .sum()
        }
        count(&self.root)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
