//! Metadata listings for `GET /` and `GET /{collection}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The response body for a metadata request on the mount root or on a
/// collection.
///
/// # Example
///
/// ```json
/// {
///   "version": "0.1.0",
///   "components": [
///     { "name": "test.one", "type": "component", "properties": {}, "supportedActions": ["next"] },
///     { "name": "sub", "type": "collection" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegistryMetadata {
    /// Version of the serving middleware. Never empty.
    pub version: String,

    /// Direct children of the listed collection, in discovery order.
    pub components: Vec<NodeSummary>,
}

/// Whether a registry node is a leaf component or a nested collection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Component,
    Collection,
}

/// One entry of [`RegistryMetadata::components`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeSummary {
    /// Name of the node, unique among its siblings.
    pub name: String,

    #[serde(rename = "type")]
    pub kind: NodeKind,

    /// Self-description of a component. Absent for collections.
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ComponentMetadata>,
}

/// What a component says about itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentMetadata {
    /// Free-form description of the properties the component reads from the
    /// request body.
    #[serde(default)]
    pub properties: Map<String, Value>,

    /// Actions (outcomes) the component may report in its result.
    #[serde(default)]
    pub supported_actions: Vec<String>,
}

impl ComponentMetadata {
    /// Add a described property.
    pub fn property(mut self, name: impl Into<String>, description: Value) -> Self {
        self.properties.insert(name.into(), description);
        self
    }

    /// Add a supported action.
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.supported_actions.push(action.into());
        self
    }
}

impl NodeSummary {
    /// Summary of a leaf component.
    pub fn component(name: impl Into<String>, metadata: ComponentMetadata) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Component,
            metadata: Some(metadata),
        }
    }

    /// Summary of a nested collection.
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Collection,
            metadata: None,
        }
    }
}
