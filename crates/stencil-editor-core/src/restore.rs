//! Snapshot capture, validation, and restoration.
//!
//! Restoration never trusts a saved anchor: the node must still be alive
//! and attached, and the offset is clamped to the node's current bounds.
//! When an anchor is gone the cursor falls back to the end of the
//! fallback container; when no container survives either, the restore
//! fails as unrestorable. The selection is replaced wholesale, never
//! partially updated.

use std::cmp::Ordering;

use stencil_dom::{Document, NodeId, Position, Range, SelectionState};

use crate::error::CursorError;
use crate::types::{EDITOR_ROOT_ATTR, RangeSnapshot, RestoreOutcome, SnapshotAnchor};

/// Capture the live selection as a snapshot.
///
/// With a `container` hint the snapshot is associated with that element;
/// otherwise the nearest content-editable or editor-root ancestor of the
/// range is recorded. That lookup is best-effort: its failure still
/// produces a snapshot, just one with no recorded container.
pub fn capture_snapshot(
    doc: &Document,
    selection: &SelectionState,
    container: Option<NodeId>,
) -> Result<RangeSnapshot, CursorError> {
    let range = selection.range().ok_or(CursorError::NoSelection)?;
    let container = container.or_else(|| resolve_editor_root(doc, &range));
    Ok(RangeSnapshot {
        start: SnapshotAnchor::new(range.start.node, range.start.offset),
        end: SnapshotAnchor::new(range.end.node, range.end.offset),
        collapsed: range.is_collapsed(),
        container,
    })
}

/// Apply a snapshot to the live selection.
///
/// The fallback container is the explicit argument when given, else the
/// container recorded at save time.
pub fn apply_snapshot(
    doc: &Document,
    selection: &mut SelectionState,
    snapshot: &RangeSnapshot,
    container: Option<NodeId>,
) -> Result<RestoreOutcome, CursorError> {
    let fallback = container.or(snapshot.container);

    let start = validate_anchor(doc, snapshot.start);
    let end = if snapshot.collapsed {
        start
    } else {
        validate_anchor(doc, snapshot.end)
    };

    let (Some(start), Some(end)) = (start, end) else {
        return fall_back_to_end(doc, selection, fallback);
    };

    let range = if snapshot.collapsed {
        Range::caret(start)
    } else {
        match doc.compare_positions(start, end) {
            Some(Ordering::Greater) => {
                // Clamping moved the boundaries past each other; a
                // collapsed caret at the start is the safe reading.
                tracing::trace!(
                    target: "stencil::cursor",
                    "clamped anchors inverted; collapsing to start"
                );
                Range::caret(start)
            }
            Some(_) => Range::new(start, end),
            None => return fall_back_to_end(doc, selection, fallback),
        }
    };
    selection.set(range);
    Ok(RestoreOutcome::AtAnchor)
}

/// Validate one anchor: the node must be alive and attached, and the
/// offset is clamped to the node's current maximum.
fn validate_anchor(doc: &Document, anchor: SnapshotAnchor) -> Option<Position> {
    if !doc.is_attached(anchor.node) {
        return None;
    }
    let max = doc.max_offset(anchor.node)?;
    Some(Position::new(anchor.node, anchor.offset.min(max)))
}

fn fall_back_to_end(
    doc: &Document,
    selection: &mut SelectionState,
    container: Option<NodeId>,
) -> Result<RestoreOutcome, CursorError> {
    let Some(container) = container else {
        return Err(CursorError::Unrestorable);
    };
    place_cursor_at_end(doc, selection, container)?;
    tracing::debug!(
        target: "stencil::cursor",
        container = %container,
        "anchors gone; cursor placed at end of container"
    );
    Ok(RestoreOutcome::EndOfContainer)
}

/// Select all contents of `element`, collapsed to the end. The universal
/// safety net when node-accurate restoration is impossible.
pub fn place_cursor_at_end(
    doc: &Document,
    selection: &mut SelectionState,
    element: NodeId,
) -> Result<(), CursorError> {
    if !doc.is_attached(element) {
        return Err(CursorError::Unrestorable);
    }
    let end = doc.end_of(element).ok_or(CursorError::Unrestorable)?;
    selection.collapse_to(end);
    Ok(())
}

/// Select all contents of `element`, collapsed to the start.
pub fn place_cursor_at_start(
    doc: &Document,
    selection: &mut SelectionState,
    element: NodeId,
) -> Result<(), CursorError> {
    if !doc.is_attached(element) {
        return Err(CursorError::Unrestorable);
    }
    let start = doc.start_of(element).ok_or(CursorError::Unrestorable)?;
    selection.collapse_to(start);
    Ok(())
}

/// Walk up from the range's common ancestor looking for an editor root.
fn resolve_editor_root(doc: &Document, range: &Range) -> Option<NodeId> {
    let ca = doc.common_ancestor(range)?;
    std::iter::once(ca)
        .chain(doc.ancestors(ca))
        .find(|&n| is_editor_root(doc, n))
}

fn is_editor_root(doc: &Document, node: NodeId) -> bool {
    doc.attribute(node, "contenteditable")
        .is_some_and(|v| v != "false")
        || doc.has_attribute(node, EDITOR_ROOT_ATTR)
}

#[cfg(test)]
mod tests {
    use super::*;

    // <body><div contenteditable="true"><p>"hello world"</p></div></body>
    fn fixture() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let editor = doc.create_element("div");
        doc.set_attribute(editor, "contenteditable", "true").unwrap();
        let p = doc.create_element("p");
        let text = doc.create_text("hello world");
        doc.append_child(doc.root(), editor).unwrap();
        doc.append_child(editor, p).unwrap();
        doc.append_child(p, text).unwrap();
        (doc, editor, p, text)
    }

    #[test]
    fn test_round_trip_without_mutation() {
        let (doc, _, _, text) = fixture();
        let mut sel = SelectionState::new();
        sel.collapse_to(Position::new(text, 4));

        let snap = capture_snapshot(&doc, &sel, None).unwrap();
        assert!(snap.collapsed);

        sel.clear();
        let outcome = apply_snapshot(&doc, &mut sel, &snap, None).unwrap();
        assert_eq!(outcome, RestoreOutcome::AtAnchor);
        assert_eq!(sel.range(), Some(Range::caret(Position::new(text, 4))));
    }

    #[test]
    fn test_offset_clamped_after_shrink() {
        let (mut doc, _, _, text) = fixture();
        let mut sel = SelectionState::new();
        sel.collapse_to(Position::new(text, 9));
        let snap = capture_snapshot(&doc, &sel, None).unwrap();

        // The text shrinks to 5 chars between save and restore.
        doc.delete_text_range(text, 5..11).unwrap();

        let outcome = apply_snapshot(&doc, &mut sel, &snap, None).unwrap();
        assert_eq!(outcome, RestoreOutcome::AtAnchor);
        assert_eq!(sel.range(), Some(Range::caret(Position::new(text, 5))));
    }

    #[test]
    fn test_detached_anchor_falls_back_to_container_end() {
        let (mut doc, editor, p, text) = fixture();
        let mut sel = SelectionState::new();
        sel.collapse_to(Position::new(text, 4));
        let snap = capture_snapshot(&doc, &sel, None).unwrap();

        doc.remove_subtree(p);

        let outcome = apply_snapshot(&doc, &mut sel, &snap, Some(editor)).unwrap();
        assert_eq!(outcome, RestoreOutcome::EndOfContainer);
        assert_eq!(sel.range(), Some(Range::caret(Position::new(editor, 0))));
    }

    #[test]
    fn test_recorded_container_used_when_no_argument() {
        let (mut doc, editor, p, text) = fixture();
        let mut sel = SelectionState::new();
        sel.collapse_to(Position::new(text, 2));
        let snap = capture_snapshot(&doc, &sel, None).unwrap();
        // The contenteditable ancestor was resolved at save time.
        assert_eq!(snap.container, Some(editor));

        doc.remove_subtree(p);
        let outcome = apply_snapshot(&doc, &mut sel, &snap, None).unwrap();
        assert_eq!(outcome, RestoreOutcome::EndOfContainer);
    }

    #[test]
    fn test_unrestorable_without_any_container() {
        let mut doc = Document::new();
        // No editor-root marker anywhere, so nothing gets recorded.
        let p = doc.create_element("p");
        let text = doc.create_text("plain");
        doc.append_child(doc.root(), p).unwrap();
        doc.append_child(p, text).unwrap();

        let mut sel = SelectionState::new();
        sel.collapse_to(Position::new(text, 3));
        let snap = capture_snapshot(&doc, &sel, None).unwrap();
        assert_eq!(snap.container, None);

        doc.remove_subtree(p);
        assert_eq!(
            apply_snapshot(&doc, &mut sel, &snap, None),
            Err(CursorError::Unrestorable)
        );
    }

    #[test]
    fn test_no_selection_fails_capture() {
        let (doc, _, _, _) = fixture();
        let sel = SelectionState::new();
        assert_eq!(
            capture_snapshot(&doc, &sel, None),
            Err(CursorError::NoSelection)
        );
    }

    #[test]
    fn test_range_selection_round_trip() {
        let (doc, _, _, text) = fixture();
        let mut sel = SelectionState::new();
        sel.set(Range::new(Position::new(text, 2), Position::new(text, 7)));
        let snap = capture_snapshot(&doc, &sel, None).unwrap();
        assert!(!snap.collapsed);

        sel.clear();
        apply_snapshot(&doc, &mut sel, &snap, None).unwrap();
        assert_eq!(
            sel.range(),
            Some(Range::new(Position::new(text, 2), Position::new(text, 7)))
        );
    }

    #[test]
    fn test_inverted_after_clamping_collapses_to_start() {
        let (mut doc, editor, p, text) = fixture();
        let tail = doc.create_text("tail");
        doc.append_child(p, tail).unwrap();

        let mut sel = SelectionState::new();
        // Selection from late in `text` into `tail`.
        sel.set(Range::new(Position::new(text, 8), Position::new(tail, 2)));
        let snap = capture_snapshot(&doc, &sel, None).unwrap();

        // `tail` moves before `text`, so the clamped end now precedes
        // the clamped start in document order.
        doc.detach(tail);
        doc.insert_child(p, 0, tail).unwrap();

        let outcome = apply_snapshot(&doc, &mut sel, &snap, Some(editor)).unwrap();
        assert_eq!(outcome, RestoreOutcome::AtAnchor);
        assert_eq!(sel.range(), Some(Range::caret(Position::new(text, 8))));
    }

    #[test]
    fn test_place_cursor_at_start_and_end() {
        let (doc, _, p, _) = fixture();
        let mut sel = SelectionState::new();

        place_cursor_at_end(&doc, &mut sel, p).unwrap();
        assert_eq!(sel.range(), Some(Range::caret(Position::new(p, 1))));

        place_cursor_at_start(&doc, &mut sel, p).unwrap();
        assert_eq!(sel.range(), Some(Range::caret(Position::new(p, 0))));
    }

    #[test]
    fn test_place_cursor_on_dead_element_fails() {
        let (mut doc, _, p, _) = fixture();
        let mut sel = SelectionState::new();
        doc.remove_subtree(p);
        assert_eq!(
            place_cursor_at_end(&doc, &mut sel, p),
            Err(CursorError::Unrestorable)
        );
    }
}
