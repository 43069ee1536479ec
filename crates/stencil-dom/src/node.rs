//! Node identifiers and node payloads for the document tree.
//!
//! Nodes are addressed by generational ids: freeing a slot bumps its
//! generation, so a stale `NodeId` held by an old cursor snapshot stops
//! resolving instead of aliasing whatever node reuses the slot.

use smol_str::SmolStr;

/// Generational handle to a node in a [`Document`](crate::Document) arena.
///
/// A `NodeId` is a non-owning back-reference: the tree can drop the node
/// at any time, and holders must re-validate through the document before
/// every use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    /// Slot index in the arena. Stable only for the node's lifetime.
    pub fn index(self) -> usize {
        self.index as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Element payload: tag name plus attributes in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    pub tag: SmolStr,
    attrs: Vec<(SmolStr, String)>,
}

impl ElementData {
    pub fn new(tag: impl Into<SmolStr>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
        }
    }

    /// Get an attribute value by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing any existing value.
    pub fn set_attr(&mut self, name: impl Into<SmolStr>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// Attributes in insertion order.
    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.attrs.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

/// What a node is: an element or a run of text.
///
/// Offsets into a text node count characters (Unicode scalar values, not
/// bytes); offsets into an element count children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(ElementData),
    Text(String),
}

impl NodeKind {
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    pub fn is_element(&self) -> bool {
        matches!(self, Self::Element(_))
    }

    /// Tag name if this is an element.
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Element(el) => Some(&el.tag),
            Self::Text(_) => None,
        }
    }
}

/// Arena record: payload plus tree links.
#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}
