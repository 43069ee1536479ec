//! Arena-backed document tree.
//!
//! The `Document` owns every node; external code holds [`NodeId`]s and
//! must go through the arena for each access, which is where liveness is
//! enforced. Slots freed by [`Document::remove_subtree`] bump their
//! generation so stale ids dereference to nothing.

use crate::node::{ElementData, NodeData, NodeId, NodeKind};

/// Errors from tree mutation and validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("node {0} is no longer alive")]
    Dead(NodeId),
    #[error("node {0} is not attached to the tree")]
    Detached(NodeId),
    #[error("node {0} is not an element")]
    NotAnElement(NodeId),
    #[error("node {0} is not a text node")]
    NotAText(NodeId),
    #[error("node {0} already has a parent")]
    AlreadyAttached(NodeId),
    #[error("child index {index} out of bounds for node {node} with {len} children")]
    IndexOutOfBounds {
        node: NodeId,
        index: usize,
        len: usize,
    },
    #[error("attaching {child} under {parent} would create a cycle")]
    WouldCycle { parent: NodeId, child: NodeId },
    #[error("positions do not share a tree")]
    Disconnected,
}

struct Slot {
    generation: u32,
    data: Option<NodeData>,
}

/// The document tree. One designated root element; everything else is
/// either attached under it or a detached fragment awaiting insertion.
pub struct Document {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document whose root is a `<body>` element.
    pub fn new() -> Self {
        let mut doc = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
        };
        doc.root = doc.alloc(NodeKind::Element(ElementData::new("body")));
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    // === Arena access ===

    pub(crate) fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let data = NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        };
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.data = Some(data);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    data: Some(data),
                });
                NodeId {
                    index,
                    generation: 0,
                }
            }
        }
    }

    pub(crate) fn node(&self, id: NodeId) -> Option<&NodeData> {
        let slot = self.slots.get(id.index())?;
        if slot.generation != id.generation {
            return None;
        }
        slot.data.as_ref()
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation != id.generation {
            return None;
        }
        slot.data.as_mut()
    }

    pub(crate) fn require(&self, id: NodeId) -> Result<&NodeData, DomError> {
        self.node(id).ok_or(DomError::Dead(id))
    }

    pub(crate) fn require_mut(&mut self, id: NodeId) -> Result<&mut NodeData, DomError> {
        self.node_mut(id).ok_or(DomError::Dead(id))
    }

    // === Node creation ===

    /// Create a detached element.
    pub fn create_element(&mut self, tag: impl Into<smol_str::SmolStr>) -> NodeId {
        self.alloc(NodeKind::Element(ElementData::new(tag)))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Text(text.into()))
    }

    // === Accessors ===

    pub fn is_alive(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.node(id).map(|d| &d.kind)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|d| d.kind.is_element())
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|d| d.kind.is_text())
    }

    /// Tag name if `id` is a live element.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.node(id).and_then(|d| d.kind.tag())
    }

    /// Text content if `id` is a live text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.node(id).map(|d| &d.kind) {
            Some(NodeKind::Text(t)) => Some(t),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|d| d.parent)
    }

    /// Children of `id`, empty for text nodes and dead ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|d| d.children.as_slice()).unwrap_or(&[])
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.children(id).len()
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Ancestors of `id`, nearest first. Does not include `id` itself.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&n| self.parent(n))
    }

    /// Whether `id` is alive and reachable from the document root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        id == self.root || self.ancestors(id).any(|n| n == self.root)
    }

    /// Inclusive containment: `contains(a, a)` is true.
    pub fn contains(&self, ancestor: NodeId, id: NodeId) -> bool {
        if !self.is_alive(ancestor) || !self.is_alive(id) {
            return false;
        }
        id == ancestor || self.ancestors(id).any(|n| n == ancestor)
    }

    /// Pre-order traversal of the subtree rooted at `id`, `id` included.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            stack: if self.is_alive(id) { vec![id] } else { vec![] },
        }
    }

    /// Maximum valid caret offset inside `id`: character count for text
    /// nodes, child count for elements. `None` if the node is dead.
    pub fn max_offset(&self, id: NodeId) -> Option<usize> {
        let data = self.node(id)?;
        Some(match &data.kind {
            NodeKind::Text(t) => t.chars().count(),
            NodeKind::Element(_) => data.children.len(),
        })
    }

    // === Attributes ===

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        match self.node(id).map(|d| &d.kind) {
            Some(NodeKind::Element(el)) => el.attr(name),
            _ => None,
        }
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: impl Into<smol_str::SmolStr>,
        value: impl Into<String>,
    ) -> Result<(), DomError> {
        let data = self.require_mut(id)?;
        match &mut data.kind {
            NodeKind::Element(el) => {
                el.set_attr(name, value);
                Ok(())
            }
            NodeKind::Text(_) => Err(DomError::NotAnElement(id)),
        }
    }

    // === Tree mutation ===

    /// Append a detached node as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let index = self.child_count(parent);
        self.insert_child(parent, index, child)
    }

    /// Insert a detached node at `index` among `parent`'s children.
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        index: usize,
        child: NodeId,
    ) -> Result<(), DomError> {
        {
            let data = self.require(parent)?;
            if !data.kind.is_element() {
                return Err(DomError::NotAnElement(parent));
            }
            if index > data.children.len() {
                return Err(DomError::IndexOutOfBounds {
                    node: parent,
                    index,
                    len: data.children.len(),
                });
            }
        }
        let child_data = self.require(child)?;
        if child_data.parent.is_some() {
            return Err(DomError::AlreadyAttached(child));
        }
        if self.contains(child, parent) {
            return Err(DomError::WouldCycle { parent, child });
        }
        self.attach_at_unchecked(parent, index, child);
        Ok(())
    }

    /// Unlink `id` from its parent; the subtree stays alive.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(data) = self.node_mut(parent) {
            data.children.retain(|&c| c != id);
        }
        if let Some(data) = self.node_mut(id) {
            data.parent = None;
        }
    }

    /// Detach `id` and free its entire subtree. Stale ids into the
    /// subtree stop resolving immediately.
    pub fn remove_subtree(&mut self, id: NodeId) {
        if !self.is_alive(id) {
            return;
        }
        self.detach(id);
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            let slot = &mut self.slots[n.index()];
            if let Some(data) = slot.data.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(n.index);
                stack.extend(data.children);
            }
        }
    }

    /// Deep-copy the subtree rooted at `id` into detached nodes.
    pub fn clone_subtree(&mut self, id: NodeId) -> Result<NodeId, DomError> {
        let data = self.require(id)?;
        let kind = data.kind.clone();
        let children = data.children.clone();
        let copy = self.alloc(kind);
        for child in children {
            let child_copy = self.clone_subtree(child)?;
            self.attach_unchecked(copy, child_copy);
        }
        Ok(copy)
    }

    // Internal attachment used where invariants are locally guaranteed
    // (parser output, subtree clones, text splits).
    pub(crate) fn attach_unchecked(&mut self, parent: NodeId, child: NodeId) {
        let index = self.child_count(parent);
        self.attach_at_unchecked(parent, index, child);
    }

    pub(crate) fn attach_at_unchecked(&mut self, parent: NodeId, index: usize, child: NodeId) {
        if let Some(data) = self.node_mut(child) {
            data.parent = Some(parent);
        }
        if let Some(data) = self.node_mut(parent) {
            data.children.insert(index, child);
        }
    }

    // === Text operations ===

    /// Text length in characters. `None` for dead or non-text nodes.
    pub fn text_len(&self, id: NodeId) -> Option<usize> {
        self.text(id).map(|t| t.chars().count())
    }

    /// Delete a character range from a text node. Offsets past the end
    /// are clamped.
    pub fn delete_text_range(
        &mut self,
        id: NodeId,
        range: std::ops::Range<usize>,
    ) -> Result<(), DomError> {
        let data = self.require_mut(id)?;
        let NodeKind::Text(text) = &mut data.kind else {
            return Err(DomError::NotAText(id));
        };
        let start = char_to_byte(text, range.start);
        let end = char_to_byte(text, range.end.max(range.start));
        text.replace_range(start..end, "");
        Ok(())
    }

    /// Split a text node at a character offset. The original keeps the
    /// head; the returned node holds the tail and is inserted as the
    /// following sibling when the original is attached.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> Result<NodeId, DomError> {
        let (tail, parent) = {
            let data = self.require_mut(id)?;
            let NodeKind::Text(text) = &mut data.kind else {
                return Err(DomError::NotAText(id));
            };
            let byte = char_to_byte(text, offset);
            let tail = text[byte..].to_string();
            text.truncate(byte);
            (tail, data.parent)
        };
        let new = self.alloc(NodeKind::Text(tail));
        if let Some(parent) = parent {
            if let Some(index) = self.index_in_parent(id) {
                self.attach_at_unchecked(parent, index + 1, new);
            }
        }
        Ok(new)
    }
}

/// Pre-order subtree iterator. See [`Document::descendants`].
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        let children = self.doc.children(id);
        self.stack.extend(children.iter().rev());
        Some(id)
    }
}

pub(crate) fn char_to_byte(s: &str, char_offset: usize) -> usize {
    s.char_indices()
        .nth(char_offset)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}
