//! stencil-editor-core: cursor preservation and safe content mutation
//! for the stencil template editor.
//!
//! This crate provides:
//! - `RangeSnapshot` - a saved selection with non-owning node anchors
//! - `CursorStore` - per-editor snapshot registry with debounced saves
//! - validation and restoration with clamping and end-of-element fallback
//! - `EditorSession` - the facade owning document, selection, and the
//!   deferred-work queues, exposing `save`/`restore`/`update_content_safely`/
//!   `smart_insert`
//!
//! Failure philosophy: every cause is an inspectable `Result` variant,
//! but nothing here ever leaves the document half-mutated. The worst
//! case is a cursor at the end of an element instead of its precise
//! prior position.

pub mod error;
pub mod restore;
pub mod session;
pub mod store;
pub mod types;

mod insert;
mod replace;

pub use error::{CursorError, InsertError};
pub use restore::{apply_snapshot, capture_snapshot, place_cursor_at_end, place_cursor_at_start};
pub use session::EditorSession;
pub use store::{CursorStore, DEFAULT_SAVE_DEBOUNCE};
pub use types::{
    EDITOR_ROOT_ATTR, ELEMENT_TYPE_ATTR, InsertMode, InsertOutcome, InsertionContext,
    RangeSnapshot, RestoreOutcome, SnapshotAnchor,
};

pub use stencil_dom::{Document, NodeId, Position, Range, SelectionState};
