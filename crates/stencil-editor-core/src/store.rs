//! Per-editor snapshot registry and debounced-save bookkeeping.
//!
//! One snapshot per editor id; inserting overwrites. Entries are never
//! aged out, only superseded or explicitly cleared. Debounce deadlines
//! are last-write-wins: re-scheduling an id discards the earlier pending
//! save entirely rather than merging with it.

use std::collections::HashMap;
use std::time::Duration;

use smol_str::SmolStr;
use stencil_dom::NodeId;
use web_time::Instant;

use crate::types::RangeSnapshot;

/// Default quiet period for debounced saves.
pub const DEFAULT_SAVE_DEBOUNCE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
struct PendingSave {
    deadline: Instant,
    container: Option<NodeId>,
}

/// Registry mapping editor ids to their last-saved snapshots, plus the
/// pending debounce deadline per id.
#[derive(Debug, Default)]
pub struct CursorStore {
    snapshots: HashMap<SmolStr, RangeSnapshot>,
    pending: HashMap<SmolStr, PendingSave>,
}

impl CursorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a snapshot, superseding any prior one for the same id.
    pub fn insert(&mut self, editor_id: impl Into<SmolStr>, snapshot: RangeSnapshot) {
        self.snapshots.insert(editor_id.into(), snapshot);
    }

    pub fn get(&self, editor_id: &str) -> Option<&RangeSnapshot> {
        self.snapshots.get(editor_id)
    }

    /// Remove the snapshot for one id and cancel its pending debounced
    /// save, if any.
    pub fn clear(&mut self, editor_id: &str) {
        self.snapshots.remove(editor_id);
        self.pending.remove(editor_id);
    }

    /// Remove every snapshot and cancel every pending debounced save.
    pub fn clear_all(&mut self) {
        self.snapshots.clear();
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Arm (or re-arm) the debounce timer for an id. A new call cancels
    /// any pending deadline for the same id and restarts the quiet
    /// period from `now`.
    pub fn schedule_save(
        &mut self,
        editor_id: impl Into<SmolStr>,
        container: Option<NodeId>,
        delay: Duration,
        now: Instant,
    ) {
        self.pending.insert(
            editor_id.into(),
            PendingSave {
                deadline: now + delay,
                container,
            },
        );
    }

    pub fn has_pending_save(&self, editor_id: &str) -> bool {
        self.pending.contains_key(editor_id)
    }

    /// Drain the entries whose quiet period has elapsed at `now`. The
    /// actual snapshot capture happens at the caller, against the
    /// selection state current at fire time.
    pub fn take_due_saves(&mut self, now: Instant) -> Vec<(SmolStr, Option<NodeId>)> {
        let mut due: Vec<SmolStr> = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(id, _)| id.clone())
            .collect();
        due.sort_unstable();
        due.into_iter()
            .map(|id| {
                let pending = self.pending.remove(&id);
                (id, pending.and_then(|p| p.container))
            })
            .collect()
    }
}
