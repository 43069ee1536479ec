//! Error taxonomy for cursor and insertion operations.
//!
//! The surrounding editor treats all of these as recoverable: worst case
//! is a cursor landing at the end of an element instead of its precise
//! prior position, never a half-mutated document. Offset overruns are
//! not errors at all (they are clamped on validation), and a selection
//! outside the insertion target is not an error either (it triggers the
//! documented append/prepend fallback, visible in the returned
//! [`InsertOutcome`](crate::InsertOutcome)).

use smol_str::SmolStr;

/// Failures of the save/restore protocol.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CursorError {
    /// No active selection existed when a save was attempted. The
    /// registry is left untouched.
    #[error("no active selection")]
    NoSelection,
    /// Restore was requested for an editor id with no saved snapshot.
    #[error("no saved cursor position for editor `{editor_id}`")]
    NotFound { editor_id: SmolStr },
    /// The saved anchors are no longer attached to the document and no
    /// fallback container is available.
    #[error("saved anchors are detached and no fallback container is available")]
    Unrestorable,
}

/// Failures of the insertion engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InsertError {
    /// Structural insertion inside a table cell is disallowed by the
    /// editing model. Nothing was mutated.
    #[error("cursor is inside a table cell; insertion refused")]
    DisallowedLocation,
    /// The insertion target is not a live, attached element.
    #[error("insertion target is not a live element")]
    InvalidTarget,
    #[error(transparent)]
    Dom(#[from] stencil_dom::DomError),
}
