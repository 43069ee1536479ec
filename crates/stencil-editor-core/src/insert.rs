//! Element insertion engine.
//!
//! A single entry point dispatches on the insertion mode; the variants
//! are independent and never transition into one another within a call.
//! Fallbacks are part of the contract: a missing or out-of-target
//! selection turns `at-cursor`/`replace` into an append and
//! `insert-before` into a prepend, and the outcome reports which path
//! actually ran.
//!
//! The fragment is parsed once into detached nodes; every insertion
//! clones the top-level nodes, so the parsed originals never alias the
//! tree and the fragment stays reusable. The originals are freed before
//! returning.

use stencil_dom::{Document, NodeId, Range, SelectionState};

use crate::error::InsertError;
use crate::restore::{capture_snapshot, place_cursor_at_end};
use crate::store::CursorStore;
use crate::types::{ELEMENT_TYPE_ATTR, InsertMode, InsertOutcome, InsertionContext};

/// Engine result handed back to the session: the path that ran, and
/// whether a snapshot-based restore should be queued for the next frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct InsertReport {
    pub outcome: InsertOutcome,
    pub queue_restore: bool,
}

pub(crate) fn smart_insert(
    doc: &mut Document,
    selection: &mut SelectionState,
    store: &mut CursorStore,
    html: &str,
    ctx: &InsertionContext,
) -> Result<InsertReport, InsertError> {
    if !doc.is_element(ctx.target) || !doc.is_attached(ctx.target) {
        return Err(InsertError::InvalidTarget);
    }
    if let Some(range) = selection.range() {
        if in_table_cell(doc, range.start.node) {
            tracing::warn!(
                target: "stencil::insert",
                editor = %ctx.editor_id,
                "insertion refused: cursor is inside a table cell"
            );
            return Err(InsertError::DisallowedLocation);
        }
    }

    let fragment = doc.parse_fragment(html);
    let result = match ctx.mode {
        InsertMode::AtCursor | InsertMode::Replace => {
            insert_at_cursor(doc, selection, store, &fragment, ctx)
        }
        InsertMode::InsertBefore => insert_before(doc, selection, store, &fragment, ctx),
        InsertMode::InsertAfter => append(doc, selection, store, &fragment, ctx),
    };
    // Only clones were attached; drop the parsed originals.
    for node in fragment {
        doc.remove_subtree(node);
    }
    result
}

// The live selection, but only when its common ancestor sits inside the
// target subtree.
fn selection_within(
    doc: &Document,
    selection: &SelectionState,
    target: NodeId,
) -> Option<Range> {
    let range = selection.range()?;
    let ca = doc.common_ancestor(&range)?;
    doc.contains(target, ca).then_some(range)
}

fn insert_at_cursor(
    doc: &mut Document,
    selection: &mut SelectionState,
    store: &mut CursorStore,
    fragment: &[NodeId],
    ctx: &InsertionContext,
) -> Result<InsertReport, InsertError> {
    let Some(range) = selection_within(doc, selection, ctx.target) else {
        tracing::debug!(
            target: "stencil::insert",
            editor = %ctx.editor_id,
            "selection absent or outside target; appending"
        );
        return append(doc, selection, store, fragment, ctx);
    };

    let mut pos = doc.delete_range_contents(&range)?;
    for &node in fragment {
        let clone = doc.clone_subtree(node)?;
        pos = doc.insert_at_position(pos, clone)?;
    }
    // The insertion point is the new cursor position by definition; no
    // snapshot protocol involved.
    selection.collapse_to(pos);
    Ok(InsertReport {
        outcome: InsertOutcome::AtCursor,
        queue_restore: false,
    })
}

fn insert_before(
    doc: &mut Document,
    selection: &mut SelectionState,
    store: &mut CursorStore,
    fragment: &[NodeId],
    ctx: &InsertionContext,
) -> Result<InsertReport, InsertError> {
    let Some(range) = selection_within(doc, selection, ctx.target) else {
        tracing::debug!(
            target: "stencil::insert",
            editor = %ctx.editor_id,
            "no usable selection; prepending"
        );
        return prepend(doc, selection, store, fragment, ctx);
    };

    let queue_restore = snapshot_before_mutation(doc, selection, store, ctx);
    // Pure insertion at the start boundary; existing content, selected
    // or not, stays put.
    let mut pos = range.start;
    for &node in fragment {
        let clone = doc.clone_subtree(node)?;
        pos = doc.insert_at_position(pos, clone)?;
    }
    Ok(InsertReport {
        outcome: InsertOutcome::BeforeCursor,
        queue_restore,
    })
}

fn append(
    doc: &mut Document,
    selection: &mut SelectionState,
    store: &mut CursorStore,
    fragment: &[NodeId],
    ctx: &InsertionContext,
) -> Result<InsertReport, InsertError> {
    let queue_restore = snapshot_before_mutation(doc, selection, store, ctx);
    for &node in fragment {
        let clone = doc.clone_subtree(node)?;
        doc.append_child(ctx.target, clone)?;
    }
    settle_cursor(doc, selection, ctx, queue_restore);
    Ok(InsertReport {
        outcome: InsertOutcome::Appended,
        queue_restore,
    })
}

fn prepend(
    doc: &mut Document,
    selection: &mut SelectionState,
    store: &mut CursorStore,
    fragment: &[NodeId],
    ctx: &InsertionContext,
) -> Result<InsertReport, InsertError> {
    let queue_restore = snapshot_before_mutation(doc, selection, store, ctx);
    for (i, &node) in fragment.iter().enumerate() {
        let clone = doc.clone_subtree(node)?;
        doc.insert_child(ctx.target, i, clone)?;
    }
    settle_cursor(doc, selection, ctx, queue_restore);
    Ok(InsertReport {
        outcome: InsertOutcome::Prepended,
        queue_restore,
    })
}

// Snapshot the live selection ahead of a structural mutation, when the
// caller asked for cursor preservation. Returns whether a snapshot was
// stored (and a deferred restore should therefore be queued).
fn snapshot_before_mutation(
    doc: &Document,
    selection: &SelectionState,
    store: &mut CursorStore,
    ctx: &InsertionContext,
) -> bool {
    if !ctx.preserve_cursor {
        return false;
    }
    match capture_snapshot(doc, selection, Some(ctx.target)) {
        Ok(snapshot) => {
            store.insert(ctx.editor_id.clone(), snapshot);
            true
        }
        Err(_) => false,
    }
}

// With no snapshot to restore, a preserving append/prepend still leaves
// the cursor somewhere sensible: the end of the target.
fn settle_cursor(
    doc: &Document,
    selection: &mut SelectionState,
    ctx: &InsertionContext,
    snapshot_taken: bool,
) {
    if ctx.preserve_cursor && !snapshot_taken {
        let _ = place_cursor_at_end(doc, selection, ctx.target);
    }
}

// A cursor counts as "inside a table cell" when some ancestor is a
// td/th whose own ancestry carries the table element-type marker.
fn in_table_cell(doc: &Document, node: NodeId) -> bool {
    let cell = std::iter::once(node)
        .chain(doc.ancestors(node))
        .find(|&n| matches!(doc.tag(n), Some("td" | "th")));
    match cell {
        Some(cell) => doc
            .ancestors(cell)
            .any(|n| doc.attribute(n, ELEMENT_TYPE_ATTR) == Some("table")),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stencil_dom::Position;

    struct Fixture {
        doc: Document,
        selection: SelectionState,
        store: CursorStore,
        editor: NodeId,
    }

    // <body><div contenteditable="true"></div></body>
    fn fixture() -> Fixture {
        let mut doc = Document::new();
        let editor = doc.create_element("div");
        doc.set_attribute(editor, "contenteditable", "true").unwrap();
        let root = doc.root();
        doc.append_child(root, editor).unwrap();
        Fixture {
            doc,
            selection: SelectionState::new(),
            store: CursorStore::new(),
            editor,
        }
    }

    fn ctx(editor: NodeId, mode: InsertMode) -> InsertionContext {
        InsertionContext::new(editor, "body").with_mode(mode)
    }

    #[test]
    fn test_at_cursor_multi_node_ordering() {
        let mut f = fixture();
        let p = f.doc.create_element("p");
        f.doc.append_child(f.editor, p).unwrap();
        f.selection.collapse_to(Position::new(p, 0));

        let report = smart_insert(
            &mut f.doc,
            &mut f.selection,
            &mut f.store,
            "<b>A</b><i>B</i>",
            &ctx(f.editor, InsertMode::AtCursor),
        )
        .unwrap();

        assert_eq!(report.outcome, InsertOutcome::AtCursor);
        assert_eq!(f.doc.inner_html(p), "<b>A</b><i>B</i>");
        // Cursor collapsed immediately after <i>B</i>.
        assert_eq!(
            f.selection.range(),
            Some(Range::caret(Position::new(p, 2)))
        );
    }

    #[test]
    fn test_at_cursor_mid_text_splits() {
        let mut f = fixture();
        let p = f.doc.create_element("p");
        let text = f.doc.create_text("hello");
        f.doc.append_child(f.editor, p).unwrap();
        f.doc.append_child(p, text).unwrap();
        f.selection.collapse_to(Position::new(text, 2));

        smart_insert(
            &mut f.doc,
            &mut f.selection,
            &mut f.store,
            "<b>A</b>",
            &ctx(f.editor, InsertMode::AtCursor),
        )
        .unwrap();

        assert_eq!(f.doc.inner_html(p), "he<b>A</b>llo");
        assert_eq!(
            f.selection.range(),
            Some(Range::caret(Position::new(p, 2)))
        );
    }

    #[test]
    fn test_replace_deletes_selection_first() {
        let mut f = fixture();
        let p = f.doc.create_element("p");
        let text = f.doc.create_text("hello");
        f.doc.append_child(f.editor, p).unwrap();
        f.doc.append_child(p, text).unwrap();
        f.selection
            .set(Range::new(Position::new(text, 1), Position::new(text, 4)));

        let report = smart_insert(
            &mut f.doc,
            &mut f.selection,
            &mut f.store,
            "<b>X</b>",
            &ctx(f.editor, InsertMode::Replace),
        )
        .unwrap();

        assert_eq!(report.outcome, InsertOutcome::AtCursor);
        assert_eq!(f.doc.inner_html(p), "h<b>X</b>o");
    }

    #[test]
    fn test_outside_target_falls_back_to_append() {
        let mut f = fixture();
        let existing = f.doc.create_element("p");
        f.doc.append_child(f.editor, existing).unwrap();

        // Stray selection in a different subtree.
        let aside = f.doc.create_element("aside");
        let stray = f.doc.create_text("elsewhere");
        let root = f.doc.root();
        f.doc.append_child(root, aside).unwrap();
        f.doc.append_child(aside, stray).unwrap();
        f.selection.collapse_to(Position::new(stray, 3));

        let report = smart_insert(
            &mut f.doc,
            &mut f.selection,
            &mut f.store,
            "<span>new</span>",
            &ctx(f.editor, InsertMode::AtCursor),
        )
        .unwrap();

        assert_eq!(report.outcome, InsertOutcome::Appended);
        assert_eq!(
            f.doc.inner_html(f.editor),
            "<p></p><span>new</span>"
        );
        // The stray selection was snapshotted for a deferred restore.
        assert!(report.queue_restore);
    }

    #[test]
    fn test_no_selection_falls_back_to_append_with_cursor_at_end() {
        let mut f = fixture();
        let report = smart_insert(
            &mut f.doc,
            &mut f.selection,
            &mut f.store,
            "<p>only</p>",
            &ctx(f.editor, InsertMode::AtCursor),
        )
        .unwrap();

        assert_eq!(report.outcome, InsertOutcome::Appended);
        assert!(!report.queue_restore);
        // No prior cursor existed, so it lands at the end of the target.
        assert_eq!(
            f.selection.range(),
            Some(Range::caret(Position::new(f.editor, 1)))
        );
    }

    #[test]
    fn test_table_cell_guard_refuses_without_mutating() {
        let mut f = fixture();
        f.doc
            .set_inner_html(
                f.editor,
                r#"<div data-element-type="table"><table><tr><td>cell</td></tr></table></div>"#,
            )
            .unwrap();
        let before = f.doc.inner_html(f.editor);

        // Caret inside the td's text node.
        let td = f
            .doc
            .descendants(f.editor)
            .find(|&n| f.doc.tag(n) == Some("td"))
            .unwrap();
        let cell_text = f.doc.children(td)[0];
        f.selection.collapse_to(Position::new(cell_text, 2));

        let result = smart_insert(
            &mut f.doc,
            &mut f.selection,
            &mut f.store,
            "<span>x</span>",
            &ctx(f.editor, InsertMode::AtCursor),
        );

        assert_eq!(result.unwrap_err(), InsertError::DisallowedLocation);
        assert_eq!(f.doc.inner_html(f.editor), before);
    }

    #[test]
    fn test_td_without_table_marker_is_not_guarded() {
        let mut f = fixture();
        f.doc
            .set_inner_html(f.editor, "<table><tr><td>cell</td></tr></table>")
            .unwrap();
        let td = f
            .doc
            .descendants(f.editor)
            .find(|&n| f.doc.tag(n) == Some("td"))
            .unwrap();
        let cell_text = f.doc.children(td)[0];
        f.selection.collapse_to(Position::new(cell_text, 4));

        let result = smart_insert(
            &mut f.doc,
            &mut f.selection,
            &mut f.store,
            "<b>!</b>",
            &ctx(f.editor, InsertMode::AtCursor),
        );
        assert!(result.is_ok());
        assert_eq!(f.doc.inner_html(td), "cell<b>!</b>");
    }

    #[test]
    fn test_insert_before_is_pure_insertion() {
        let mut f = fixture();
        let p = f.doc.create_element("p");
        let text = f.doc.create_text("hello");
        f.doc.append_child(f.editor, p).unwrap();
        f.doc.append_child(p, text).unwrap();
        f.selection
            .set(Range::new(Position::new(text, 2), Position::new(text, 4)));

        let report = smart_insert(
            &mut f.doc,
            &mut f.selection,
            &mut f.store,
            "<span>x</span>",
            &ctx(f.editor, InsertMode::InsertBefore),
        )
        .unwrap();

        assert_eq!(report.outcome, InsertOutcome::BeforeCursor);
        // Selected text is still there; nothing was deleted.
        assert_eq!(f.doc.inner_html(p), "he<span>x</span>llo");
        assert!(report.queue_restore);
        assert!(f.store.get("body").is_some());
    }

    #[test]
    fn test_insert_before_without_selection_prepends() {
        let mut f = fixture();
        let existing = f.doc.create_element("p");
        f.doc.append_child(f.editor, existing).unwrap();

        let report = smart_insert(
            &mut f.doc,
            &mut f.selection,
            &mut f.store,
            "<b>A</b><i>B</i>",
            &ctx(f.editor, InsertMode::InsertBefore),
        )
        .unwrap();

        assert_eq!(report.outcome, InsertOutcome::Prepended);
        assert_eq!(
            f.doc.inner_html(f.editor),
            "<b>A</b><i>B</i><p></p>"
        );
    }

    #[test]
    fn test_insert_after_ignores_selection() {
        let mut f = fixture();
        let p = f.doc.create_element("p");
        let text = f.doc.create_text("hi");
        f.doc.append_child(f.editor, p).unwrap();
        f.doc.append_child(p, text).unwrap();
        f.selection.collapse_to(Position::new(text, 1));

        let report = smart_insert(
            &mut f.doc,
            &mut f.selection,
            &mut f.store,
            "<footer>end</footer>",
            &ctx(f.editor, InsertMode::InsertAfter),
        )
        .unwrap();

        assert_eq!(report.outcome, InsertOutcome::Appended);
        assert_eq!(
            f.doc.inner_html(f.editor),
            "<p>hi</p><footer>end</footer>"
        );
        // The live cursor was snapshotted for a deferred restore and
        // not touched by the append itself.
        assert!(report.queue_restore);
        assert_eq!(
            f.selection.range(),
            Some(Range::caret(Position::new(text, 1)))
        );
    }

    #[test]
    fn test_invalid_target() {
        let mut f = fixture();
        let detached = f.doc.create_element("div");
        let ctx = InsertionContext::new(detached, "body");
        assert_eq!(
            smart_insert(&mut f.doc, &mut f.selection, &mut f.store, "<p>x</p>", &ctx),
            Err(InsertError::InvalidTarget)
        );
    }

    #[test]
    fn test_preserve_cursor_disabled_leaves_selection_alone() {
        let mut f = fixture();
        let report = smart_insert(
            &mut f.doc,
            &mut f.selection,
            &mut f.store,
            "<p>x</p>",
            &ctx(f.editor, InsertMode::InsertAfter).preserve_cursor(false),
        )
        .unwrap();
        assert!(!report.queue_restore);
        assert!(f.selection.is_empty());
        assert!(f.store.is_empty());
    }
}
