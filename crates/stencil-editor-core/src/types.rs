//! Core value types: snapshot anchors, range snapshots, insertion intents.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use stencil_dom::NodeId;

/// Attribute marking an element as a logical editor root. Used when a
/// save has no explicit container hint.
pub const EDITOR_ROOT_ATTR: &str = "data-editor-root";

/// Attribute carrying the logical element type of a design component.
/// The insertion guard looks for `data-element-type="table"` wrappers.
pub const ELEMENT_TYPE_ATTR: &str = "data-element-type";

/// One endpoint of a saved selection: a non-owning node reference plus
/// the offset that was current at save time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotAnchor {
    pub node: NodeId,
    pub offset: usize,
}

impl SnapshotAnchor {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// A saved selection.
///
/// Offsets are only valid relative to the state their node had at save
/// time; intervening edits can shrink or detach the node, so both anchors
/// must be re-validated (liveness check plus clamping) before every use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSnapshot {
    pub start: SnapshotAnchor,
    pub end: SnapshotAnchor,
    /// True for a caret, false for a range selection. When true, `end`
    /// carries no meaning.
    pub collapsed: bool,
    /// Best-effort editor root resolved at save time: the explicit hint
    /// if one was given, else the nearest content-editable or
    /// editor-root-marked ancestor of the range. May be absent.
    pub container: Option<NodeId>,
}

impl RangeSnapshot {
    /// Snapshot of a caret.
    pub fn caret(anchor: SnapshotAnchor, container: Option<NodeId>) -> Self {
        Self {
            start: anchor,
            end: anchor,
            collapsed: true,
            container,
        }
    }
}

/// Insertion policy for [`smart_insert`](crate::EditorSession::smart_insert).
///
/// Wire names are kebab-case. Unrecognized names map to `AtCursor`, the
/// documented default, via [`InsertMode::from_wire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InsertMode {
    /// Delete the current selection, insert in its place.
    Replace,
    /// Pure insertion at the selection start; nothing is deleted.
    InsertBefore,
    /// Append as the target's last children. Ignores the selection.
    InsertAfter,
    /// Delete the current range's contents and insert at the collapsed
    /// point. The default, and the fallback for unrecognized policies.
    #[default]
    AtCursor,
}

impl InsertMode {
    /// Parse a wire name. Unrecognized names fall back to `AtCursor`.
    /// `"append"` is accepted as an alias for `insert-after`.
    pub fn from_wire(name: &str) -> Self {
        match name {
            "replace" => Self::Replace,
            "insert-before" => Self::InsertBefore,
            "insert-after" | "append" => Self::InsertAfter,
            _ => Self::AtCursor,
        }
    }

    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Replace => "replace",
            Self::InsertBefore => "insert-before",
            Self::InsertAfter => "insert-after",
            Self::AtCursor => "at-cursor",
        }
    }
}

/// Everything an insertion needs besides the fragment itself.
#[derive(Debug, Clone)]
pub struct InsertionContext {
    /// The subtree fragments are inserted into. Caller-owned; the engine
    /// never creates or destroys it.
    pub target: NodeId,
    /// Key into the cursor registry for this operation.
    pub editor_id: SmolStr,
    /// Snapshot/restore around the mutation where the variant calls for it.
    pub preserve_cursor: bool,
    pub mode: InsertMode,
}

impl InsertionContext {
    pub fn new(target: NodeId, editor_id: impl Into<SmolStr>) -> Self {
        Self {
            target,
            editor_id: editor_id.into(),
            preserve_cursor: true,
            mode: InsertMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: InsertMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn preserve_cursor(mut self, preserve: bool) -> Self {
        self.preserve_cursor = preserve;
        self
    }
}

/// How a restoration landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The saved anchors were live; the selection sits at them, offsets
    /// clamped to current bounds where needed.
    AtAnchor,
    /// Anchors were gone; the cursor was placed at the end of the
    /// fallback container instead.
    EndOfContainer,
}

/// Which insertion path actually ran, fallbacks included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Inserted at the (possibly just-collapsed) cursor position.
    AtCursor,
    /// Pure insertion at the selection start boundary.
    BeforeCursor,
    /// Appended as the target's last children.
    Appended,
    /// Prepended as the target's first children.
    Prepended,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_wire() {
        assert_eq!(InsertMode::from_wire("replace"), InsertMode::Replace);
        assert_eq!(InsertMode::from_wire("insert-before"), InsertMode::InsertBefore);
        assert_eq!(InsertMode::from_wire("insert-after"), InsertMode::InsertAfter);
        assert_eq!(InsertMode::from_wire("append"), InsertMode::InsertAfter);
        assert_eq!(InsertMode::from_wire("at-cursor"), InsertMode::AtCursor);
        // Unrecognized policies get the documented default.
        assert_eq!(InsertMode::from_wire("sideways"), InsertMode::AtCursor);
        assert_eq!(InsertMode::from_wire(""), InsertMode::AtCursor);
    }

    #[test]
    fn test_wire_serde() {
        let mode: InsertMode = serde_json::from_str("\"insert-before\"").unwrap();
        assert_eq!(mode, InsertMode::InsertBefore);
        assert_eq!(
            serde_json::to_string(&InsertMode::AtCursor).unwrap(),
            "\"at-cursor\""
        );
    }

    #[test]
    fn test_wire_round_trip() {
        for mode in [
            InsertMode::Replace,
            InsertMode::InsertBefore,
            InsertMode::InsertAfter,
            InsertMode::AtCursor,
        ] {
            assert_eq!(InsertMode::from_wire(mode.wire_name()), mode);
        }
    }
}
