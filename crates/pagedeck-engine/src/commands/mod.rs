#![forbid(unsafe_code)]

//! Concrete command variants.
//!
//! Each variant is a plain data struct carrying both its parameters and any
//! state it captured for its inverse. Captured buffers are serialized with
//! the command, so a variant decoded from storage undoes and redoes exactly
//! like the instance that was executed before the reload.
//!
//! # Module Structure
//!
//! - [`structural`]: commands that change which entries the page list holds
//!   and where (add, delete, duplicate, reorder, split, remove-source)
//! - [`annotate`]: commands that edit fields of existing entries (rotation,
//!   resize, redactions, outline)
//! - [`batch`]: composition of commands into one atomic history entry

pub mod annotate;
pub mod batch;
pub mod structural;

use pagedeck_model::PageEntry;
use serde::{Deserialize, Serialize};

pub use annotate::{
    AddRedaction, CapturedDimensions, DeleteRedaction, ResizePages, RotatePages, UpdateOutline,
    UpdateRedaction,
};
pub use batch::BatchCommand;
pub use structural::{
    AddPages, DeletePages, DuplicatePages, PageCopy, RemoveSource, ReorderPages, SplitGroup,
};

/// A `{entry, index}` capture taken before a structural mutation.
///
/// Restore walks captures in ascending-index order so earlier insertions
/// never shift the index a later capture needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    pub index: usize,
    pub entry: PageEntry,
}
