#![forbid(unsafe_code)]

//! pagedeck document model.
//!
//! This crate holds the canonical state of a pagedeck project: the ordered
//! page list (page references and divider markers), the source-file
//! registry, and the editable outline of the assembled output document.
//!
//! The model is pure data. Every mutation goes through the primitive
//! operations on [`DocumentModel`], all of which are synchronous and total —
//! operating on a missing id is a no-op, never an error. Undo/redo lives one
//! crate up, in `pagedeck-engine`, which captures inverses on top of these
//! primitives.
//!
//! # Role in pagedeck
//!
//! `pagedeck-model` is the leaf of the workspace: the engine mutates it,
//! persistence snapshots it, and the (external) renderer reads it. It never
//! depends back on any of them.

pub mod document;
pub mod page;
pub mod source;

pub use document::DocumentModel;
pub use page::{
    DividerReference, PageDimensions, PageEntry, PageReference, RedactionMark, normalize_rotation,
};
pub use source::{OutlineNode, PageMeta, SourceFile, SourceMetadata};

use web_time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch, safe on wasm32 and native.
#[must_use]
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
