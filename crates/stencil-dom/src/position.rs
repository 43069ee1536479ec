//! Caret positions, ranges, and the session selection value.
//!
//! A [`Position`] is a boundary point in the tree: a character offset
//! inside a text node, or a child index inside an element. [`Range`] is a
//! pair of boundary points. [`SelectionState`] is the single mutable
//! selection value an editor session owns in place of the browser's
//! ambient global selection.

use std::cmp::Ordering;

use crate::document::{Document, DomError};
use crate::node::{NodeId, NodeKind};

/// A boundary point in the document tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub node: NodeId,
    pub offset: usize,
}

impl Position {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// A pair of boundary points. `start` and `end` are equal for a caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// A collapsed range (caret).
    pub fn caret(pos: Position) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// The single mutable selection value owned by an editor session.
///
/// The browser exposes one process-wide "current selection" with no
/// explicit lifecycle; here it is an explicit value passed to each
/// operation that reads or replaces the selection.
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    range: Option<Range>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn range(&self) -> Option<Range> {
        self.range
    }

    /// Replace the live selection.
    pub fn set(&mut self, range: Range) {
        self.range = Some(range);
    }

    /// Collapse the live selection to a caret.
    pub fn collapse_to(&mut self, pos: Position) {
        self.range = Some(Range::caret(pos));
    }

    pub fn clear(&mut self) {
        self.range = None;
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_none()
    }
}

impl Document {
    /// Boundary position at the very start of a node's contents.
    pub fn start_of(&self, node: NodeId) -> Option<Position> {
        self.max_offset(node).map(|_| Position::new(node, 0))
    }

    /// Boundary position at the very end of a node's contents. This is
    /// the "select all contents, collapse to end" point.
    pub fn end_of(&self, node: NodeId) -> Option<Position> {
        self.max_offset(node).map(|max| Position::new(node, max))
    }

    /// Compare two boundary points in document order. `None` when the
    /// positions do not share a tree (dead or detached differently).
    pub fn compare_positions(&self, a: Position, b: Position) -> Option<Ordering> {
        if a.node == b.node {
            self.node(a.node)?;
            return Some(a.offset.cmp(&b.offset));
        }
        let pa = self.boundary_path(a)?;
        let pb = self.boundary_path(b)?;
        Some(pa.cmp(&pb))
    }

    // Child-index path from the root to the position, offset last.
    // Lexicographic comparison of these paths is document order; a prefix
    // sorts first, which matches a boundary sitting just before the
    // content it prefixes.
    fn boundary_path(&self, pos: Position) -> Option<Vec<usize>> {
        self.node(pos.node)?;
        let mut path = vec![pos.offset];
        let mut n = pos.node;
        while let Some(parent) = self.parent(n) {
            path.push(self.index_in_parent(n)?);
            n = parent;
        }
        if n != self.root() {
            return None;
        }
        path.reverse();
        Some(path)
    }

    /// Nearest node containing both endpoints, the endpoint nodes
    /// themselves included.
    pub fn common_ancestor(&self, range: &Range) -> Option<NodeId> {
        let a = range.start.node;
        let b = range.end.node;
        if !self.is_alive(a) || !self.is_alive(b) {
            return None;
        }
        let chain: Vec<NodeId> = std::iter::once(a).chain(self.ancestors(a)).collect();
        std::iter::once(b)
            .chain(self.ancestors(b))
            .find(|n| chain.contains(n))
    }

    /// Remove everything between the range's boundary points, trimming
    /// partially covered text nodes and deleting wholly contained ones.
    /// Returns the collapsed caret position at the start boundary.
    ///
    /// Offsets are clamped to each node's current bounds before use, and
    /// an inverted range is normalized, so a stale range degrades rather
    /// than corrupting the tree.
    pub fn delete_range_contents(&mut self, range: &Range) -> Result<Position, DomError> {
        let mut start = range.start;
        let mut end = range.end;
        start.offset = start
            .offset
            .min(self.max_offset(start.node).ok_or(DomError::Dead(start.node))?);
        end.offset = end
            .offset
            .min(self.max_offset(end.node).ok_or(DomError::Dead(end.node))?);

        match self.compare_positions(start, end) {
            None => return Err(DomError::Disconnected),
            Some(Ordering::Greater) => std::mem::swap(&mut start, &mut end),
            Some(_) => {}
        }
        if start == end {
            return Ok(start);
        }

        if start.node == end.node {
            if self.is_text(start.node) {
                self.delete_text_range(start.node, start.offset..end.offset)?;
            } else {
                let victims = self.children(start.node)[start.offset..end.offset].to_vec();
                for v in victims {
                    self.remove_subtree(v);
                }
            }
            return Ok(start);
        }

        let ca = self
            .common_ancestor(&Range::new(start, end))
            .ok_or(DomError::Disconnected)?;

        // Trim the start container past the boundary, then climb toward
        // the common ancestor clearing everything after the branch.
        let start_bound = if start.node == ca {
            start.offset
        } else {
            self.cut_after(start)?;
            let mut n = start.node;
            loop {
                let parent = self.parent(n).ok_or(DomError::Disconnected)?;
                let index = self.index_in_parent(n).ok_or(DomError::Disconnected)?;
                if parent == ca {
                    break index + 1;
                }
                let victims = self.children(parent)[index + 1..].to_vec();
                for v in victims {
                    self.remove_subtree(v);
                }
                n = parent;
            }
        };

        // Mirror image for the end side: trim before the boundary, climb
        // clearing everything before the branch.
        let end_bound = if end.node == ca {
            end.offset
        } else {
            self.cut_before(end)?;
            let mut n = end.node;
            loop {
                let parent = self.parent(n).ok_or(DomError::Disconnected)?;
                let index = self.index_in_parent(n).ok_or(DomError::Disconnected)?;
                if parent == ca {
                    break index;
                }
                let victims = self.children(parent)[..index].to_vec();
                for v in victims {
                    self.remove_subtree(v);
                }
                n = parent;
            }
        };

        let victims = self.children(ca)[start_bound..end_bound].to_vec();
        for v in victims {
            self.remove_subtree(v);
        }
        Ok(start)
    }

    // Delete the contents of the position's container after the boundary.
    fn cut_after(&mut self, pos: Position) -> Result<(), DomError> {
        if self.is_text(pos.node) {
            let len = self.text_len(pos.node).ok_or(DomError::Dead(pos.node))?;
            self.delete_text_range(pos.node, pos.offset..len)
        } else {
            let victims = self.children(pos.node)[pos.offset..].to_vec();
            for v in victims {
                self.remove_subtree(v);
            }
            Ok(())
        }
    }

    // Delete the contents of the position's container before the boundary.
    fn cut_before(&mut self, pos: Position) -> Result<(), DomError> {
        if self.is_text(pos.node) {
            self.delete_text_range(pos.node, 0..pos.offset)
        } else {
            let victims = self.children(pos.node)[..pos.offset].to_vec();
            for v in victims {
                self.remove_subtree(v);
            }
            Ok(())
        }
    }

    /// Insert a detached node at a caret position, splitting a text node
    /// when the caret falls mid-text. Returns the position immediately
    /// after the inserted node, so repeated insertion keeps a multi-node
    /// fragment in document order.
    pub fn insert_at_position(
        &mut self,
        pos: Position,
        node: NodeId,
    ) -> Result<Position, DomError> {
        let is_text = match self.node(pos.node).map(|d| &d.kind) {
            None => return Err(DomError::Dead(pos.node)),
            Some(NodeKind::Text(_)) => true,
            Some(NodeKind::Element(_)) => false,
        };

        if !is_text {
            let len = self.child_count(pos.node);
            let index = pos.offset.min(len);
            self.insert_child(pos.node, index, node)?;
            return Ok(Position::new(pos.node, index + 1));
        }

        let parent = self.parent(pos.node).ok_or(DomError::Detached(pos.node))?;
        let sibling_index = self
            .index_in_parent(pos.node)
            .ok_or(DomError::Detached(pos.node))?;
        let len = self.text_len(pos.node).ok_or(DomError::Dead(pos.node))?;
        let offset = pos.offset.min(len);

        let index = if offset == 0 {
            sibling_index
        } else if offset == len {
            sibling_index + 1
        } else {
            self.split_text(pos.node, offset)?;
            sibling_index + 1
        };
        self.insert_child(parent, index, node)?;
        Ok(Position::new(parent, index + 1))
    }
}
