//! Safe content replacement.
//!
//! Replacing an element's serialized content is a full-subtree swap, not
//! a diff. The trade-off is deliberate: cursor correctness is handled
//! entirely by the snapshot/restore protocol, so the swap itself stays
//! trivial. The snapshot is taken before the swap and the restore runs
//! deferred, once the mutation has settled; a failed restore degrades to
//! "cursor lost" and never undoes the content update.

use smol_str::SmolStr;
use stencil_dom::{Document, NodeId, SelectionState};

use crate::restore::capture_snapshot;
use crate::store::CursorStore;

/// Replace `element`'s content with `html`, optionally snapshotting the
/// selection first. Returns whether a snapshot was stored and a deferred
/// restore should be queued.
///
/// The content update happens synchronously and unconditionally: a
/// failed snapshot (no active selection) does not stop it, and a dead
/// `element` degrades to a logged no-op.
pub(crate) fn update_content(
    doc: &mut Document,
    selection: &SelectionState,
    store: &mut CursorStore,
    editor_id: &SmolStr,
    element: NodeId,
    html: &str,
    preserve_cursor: bool,
) -> bool {
    let mut queue_restore = false;
    if preserve_cursor {
        if let Ok(snapshot) = capture_snapshot(doc, selection, Some(element)) {
            store.insert(editor_id.clone(), snapshot);
            queue_restore = true;
        }
    }
    if let Err(err) = doc.set_inner_html(element, html) {
        tracing::debug!(
            target: "stencil::cursor",
            editor = %editor_id,
            %err,
            "content update skipped"
        );
        return false;
    }
    queue_restore
}
