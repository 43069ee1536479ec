//! stencil-dom: explicit document-tree substrate for the stencil editor.
//!
//! This crate provides:
//! - `Document` - arena-backed node tree with generational ids
//! - `Position` / `Range` - boundary points with browser Range semantics
//! - `SelectionState` - the session-owned selection value
//! - lenient HTML fragment parsing and serialization
//!
//! Node handles are non-owning: a `NodeId` can outlive its node, and all
//! access re-validates liveness through the arena.

pub mod document;
pub mod node;
pub mod parse;
pub mod position;
pub mod serialize;

pub use document::{Descendants, Document, DomError};
pub use node::{ElementData, NodeId, NodeKind};
pub use position::{Position, Range, SelectionState};
