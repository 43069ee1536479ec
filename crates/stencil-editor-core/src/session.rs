//! Editor session facade.
//!
//! Owns the document, the single selection value, the cursor registry,
//! and the deferred-work queues, and exposes the public cursor and
//! insertion API the surrounding editor UI calls.
//!
//! Deferral model: deferred restorations go through a FIFO frame queue
//! that the host drains with [`EditorSession::run_frame`] once a
//! mutation has settled (the next-animation-frame slot in a browser
//! host). Debounced saves mature on a deadline and fire from
//! [`EditorSession::poll_debounced_saves`]. Neither queue blocks; a
//! request whose anchors died in the meantime degrades through the
//! validator instead of corrupting the selection.

use std::time::Duration;

use smol_str::SmolStr;
use stencil_dom::{Document, NodeId, SelectionState};
use web_time::Instant;

use crate::error::{CursorError, InsertError};
use crate::insert;
use crate::replace;
use crate::restore;
use crate::store::CursorStore;
use crate::types::{InsertOutcome, InsertionContext, RangeSnapshot, RestoreOutcome};

#[derive(Debug, Clone)]
struct PendingRestore {
    editor_id: SmolStr,
    container: Option<NodeId>,
}

/// A live editing session over one document.
#[derive(Default)]
pub struct EditorSession {
    document: Document,
    selection: SelectionState,
    store: CursorStore,
    frame_queue: Vec<PendingRestore>,
}

impl EditorSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session over an existing document.
    pub fn with_document(document: Document) -> Self {
        Self {
            document,
            selection: SelectionState::new(),
            store: CursorStore::new(),
            frame_queue: Vec::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// Hosts set the selection from input events through this.
    pub fn selection_mut(&mut self) -> &mut SelectionState {
        &mut self.selection
    }

    /// The last-saved snapshot for an editor id, if any.
    pub fn snapshot(&self, editor_id: &str) -> Option<&RangeSnapshot> {
        self.store.get(editor_id)
    }

    // === Save / restore ===

    /// Snapshot the live selection under `editor_id`, superseding any
    /// prior snapshot for that id. With no active selection the registry
    /// is left untouched and `NoSelection` is returned.
    pub fn save_cursor_position(
        &mut self,
        editor_id: &str,
        container: Option<NodeId>,
    ) -> Result<RangeSnapshot, CursorError> {
        let snapshot = restore::capture_snapshot(&self.document, &self.selection, container)?;
        self.store.insert(editor_id, snapshot);
        Ok(snapshot)
    }

    /// Coalesce rapid saves: the snapshot is taken only after `delay` of
    /// quiet, from [`poll_debounced_saves`](Self::poll_debounced_saves).
    /// A new call for the same id cancels and restarts the timer.
    pub fn save_cursor_position_debounced(
        &mut self,
        editor_id: &str,
        container: Option<NodeId>,
        delay: Duration,
    ) {
        self.store
            .schedule_save(editor_id, container, delay, Instant::now());
    }

    /// Fire matured debounced saves against the selection state current
    /// now. Returns how many snapshots were stored.
    pub fn poll_debounced_saves(&mut self) -> usize {
        let due = self.store.take_due_saves(Instant::now());
        let mut fired = 0;
        for (editor_id, container) in due {
            match restore::capture_snapshot(&self.document, &self.selection, container) {
                Ok(snapshot) => {
                    self.store.insert(editor_id, snapshot);
                    fired += 1;
                }
                Err(err) => {
                    tracing::trace!(
                        target: "stencil::cursor",
                        editor = %editor_id,
                        %err,
                        "debounced save skipped"
                    );
                }
            }
        }
        fired
    }

    /// Re-apply the last snapshot saved under `editor_id`. See
    /// [`restore::apply_snapshot`] for the validation and fallback rules.
    pub fn restore_cursor_position(
        &mut self,
        editor_id: &str,
        container: Option<NodeId>,
    ) -> Result<RestoreOutcome, CursorError> {
        let snapshot = self
            .store
            .get(editor_id)
            .copied()
            .ok_or_else(|| CursorError::NotFound {
                editor_id: editor_id.into(),
            })?;
        restore::apply_snapshot(&self.document, &mut self.selection, &snapshot, container)
    }

    /// Drop the snapshot for one editor id and cancel its pending
    /// debounced save.
    pub fn clear_cursor(&mut self, editor_id: &str) {
        self.store.clear(editor_id);
    }

    pub fn clear_all_cursors(&mut self) {
        self.store.clear_all();
    }

    /// Collapse the selection to the end of `element`'s contents.
    pub fn place_cursor_at_end(&mut self, element: NodeId) -> Result<(), CursorError> {
        restore::place_cursor_at_end(&self.document, &mut self.selection, element)
    }

    /// Collapse the selection to the start of `element`'s contents.
    pub fn place_cursor_at_start(&mut self, element: NodeId) -> Result<(), CursorError> {
        restore::place_cursor_at_start(&self.document, &mut self.selection, element)
    }

    // === Mutation wrappers ===

    /// Replace `element`'s content with `html`, preserving the cursor
    /// around the swap when asked. The content update is synchronous;
    /// the restoration runs on the next [`run_frame`](Self::run_frame).
    /// Restoration failure degrades to a lost cursor, never to a
    /// reverted or partial content update.
    pub fn update_content_safely(
        &mut self,
        editor_id: &str,
        element: NodeId,
        html: &str,
        preserve_cursor: bool,
    ) {
        let editor_id = SmolStr::new(editor_id);
        let queue = replace::update_content(
            &mut self.document,
            &self.selection,
            &mut self.store,
            &editor_id,
            element,
            html,
            preserve_cursor,
        );
        if queue {
            self.schedule_restore(editor_id, Some(element));
        }
    }

    /// Run an arbitrary mutation with a cursor snapshot taken before and
    /// a restoration scheduled after, whether the mutation succeeds or
    /// fails. The mutation's own result propagates unchanged.
    pub fn execute_with_cursor_preservation<T, E>(
        &mut self,
        editor_id: &str,
        element: NodeId,
        mutation: impl FnOnce(&mut Self) -> Result<T, E>,
    ) -> Result<T, E> {
        let editor_id = SmolStr::new(editor_id);
        if let Ok(snapshot) =
            restore::capture_snapshot(&self.document, &self.selection, Some(element))
        {
            self.store.insert(editor_id.clone(), snapshot);
        }
        let result = mutation(self);
        // Scheduled on the error path too; best effort either way.
        self.schedule_restore(editor_id, Some(element));
        result
    }

    /// Insert an HTML fragment per the context's insertion mode. See the
    /// engine in [`crate::insert`] for the per-mode contract.
    pub fn smart_insert(
        &mut self,
        html: &str,
        ctx: &InsertionContext,
    ) -> Result<InsertOutcome, InsertError> {
        let report = insert::smart_insert(
            &mut self.document,
            &mut self.selection,
            &mut self.store,
            html,
            ctx,
        )?;
        if report.queue_restore {
            self.schedule_restore(ctx.editor_id.clone(), Some(ctx.target));
        }
        Ok(report.outcome)
    }

    // === Deferred work ===

    fn schedule_restore(&mut self, editor_id: SmolStr, container: Option<NodeId>) {
        self.frame_queue.push(PendingRestore {
            editor_id,
            container,
        });
    }

    /// Number of restorations waiting for the next frame.
    pub fn pending_restores(&self) -> usize {
        self.frame_queue.len()
    }

    /// Drain the frame queue, applying each scheduled restoration in
    /// order. Individual failures are logged and skipped; returns how
    /// many restorations applied.
    pub fn run_frame(&mut self) -> usize {
        let queued = std::mem::take(&mut self.frame_queue);
        let mut applied = 0;
        for pending in queued {
            match self.restore_cursor_position(&pending.editor_id, pending.container) {
                Ok(_) => applied += 1,
                Err(err) => {
                    tracing::trace!(
                        target: "stencil::cursor",
                        editor = %pending.editor_id,
                        %err,
                        "deferred restore skipped"
                    );
                }
            }
        }
        applied
    }
}
