use crate::errors::FlowError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Debug;
use tracing::instrument;

/// Snapshot of the attributes the engine reads off a tree node.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct ElementAttributes {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub role: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(default)]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
}

impl fmt::Debug for ElementAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug_struct = f.debug_struct("ElementAttributes");
        if !self.role.is_empty() {
            debug_struct.field("role", &self.role);
        }
        if !self.text.is_empty() {
            debug_struct.field("text", &self.text);
        }
        if let Some(ref name) = self.name {
            debug_struct.field("name", name);
        }
        if !self.value.is_empty() {
            debug_struct.field("value", &self.value);
        }
        debug_struct.field("visible", &self.visible);
        if let Some(checked) = self.checked {
            debug_struct.field("checked", &checked);
        }
        debug_struct.finish()
    }
}

/// Interface the visual-tree collaborator implements per node.
///
/// Reads are snapshot semantics: they reflect the tree at call time and
/// never wait. Actions dispatch synthetic input back into the tree.
pub trait ElementImpl: Send + Sync + Debug {
    fn role(&self) -> String;
    /// Raw text content. Callers match against the trimmed form.
    fn text(&self) -> String;
    /// The node's `name` attribute, when the collaborator exposes one.
    fn name(&self) -> Option<String>;
    /// Current entered value for input-like nodes; empty otherwise.
    fn value(&self) -> String;
    /// Whether the node is rendered with non-zero size.
    fn is_visible(&self) -> bool;
    /// Checked flag for toggle controls. Errors for non-toggle nodes.
    fn is_checked(&self) -> Result<bool, FlowError>;
    /// Dispatch a synthetic click on the node.
    fn click(&self) -> Result<(), FlowError>;
    /// Synthesize a pointer enter/over/move sequence at the node's
    /// geometric center.
    fn hover(&self) -> Result<(), FlowError>;
    /// Override the minimal set of visual properties needed to make a
    /// hidden node clickable. Collaborators whose hidden nodes accept
    /// clicks may implement this as a no-op.
    fn force_visible(&self) -> Result<(), FlowError>;
    fn as_any(&self) -> &dyn std::any::Any;
    fn clone_box(&self) -> Box<dyn ElementImpl>;
}

/// A transient handle to a node in the visual tree.
///
/// The tree owns the node; the engine only references it within one step
/// and never assumes it stays attached across waits.
#[derive(Debug)]
pub struct Element {
    inner: Box<dyn ElementImpl>,
}

impl Element {
    /// Wrap a collaborator-specific node implementation.
    pub fn new(impl_: Box<dyn ElementImpl>) -> Self {
        Self { inner: impl_ }
    }

    pub fn role(&self) -> String {
        self.inner.role()
    }

    /// Text content with surrounding whitespace stripped, which is the
    /// form all matching operates on.
    pub fn text(&self) -> String {
        self.inner.text().trim().to_string()
    }

    pub fn name(&self) -> Option<String> {
        self.inner.name()
    }

    pub fn value(&self) -> String {
        self.inner.value()
    }

    pub fn is_visible(&self) -> bool {
        self.inner.is_visible()
    }

    pub fn is_checked(&self) -> Result<bool, FlowError> {
        self.inner.is_checked()
    }

    /// Click on this element.
    #[instrument(level = "debug", skip(self))]
    pub fn click(&self) -> Result<(), FlowError> {
        self.inner.click()
    }

    /// Hover over this element.
    #[instrument(level = "debug", skip(self))]
    pub fn hover(&self) -> Result<(), FlowError> {
        self.inner.hover()
    }

    /// Make a hidden element renderable so a click can land on it.
    #[instrument(level = "debug", skip(self))]
    pub fn force_visible(&self) -> Result<(), FlowError> {
        self.inner.force_visible()
    }

    pub fn attributes(&self) -> ElementAttributes {
        ElementAttributes {
            role: self.role(),
            text: self.text(),
            name: self.name(),
            value: self.value(),
            visible: self.is_visible(),
            checked: self.is_checked().ok(),
        }
    }

    pub fn as_any(&self) -> &dyn std::any::Any {
        self.inner.as_any()
    }
}

impl Clone for Element {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone_box(),
        }
    }
}
