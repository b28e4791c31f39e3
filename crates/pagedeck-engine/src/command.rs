#![forbid(unsafe_code)]

//! The command entity and its closed kind set.
//!
//! A [`Command`] is a named, reversible unit of mutation: execute applies it
//! to the document model, undo exactly reverses the most recent execute.
//! The concrete mutation lives in [`CommandKind`] — a closed sum type, so
//! dispatch is a `match` and serialization can pattern-match the tag
//! instead of going through virtual hooks.
//!
//! # Invariants
//!
//! - `undo()` immediately followed by `execute()` reproduces the exact
//!   pre-undo document state, for any legal starting state.
//! - A command is executed at most once per logical "do"; redo calls
//!   `execute` again and every variant tolerates that (lazily-captured
//!   buffers are only populated while empty).
//! - Type tags are stable strings, never derived from a Rust type name.
//! - Construction validates arguments; an invalid command cannot be built,
//!   so the history stack never has to reject one.
//!
//! # Failure Modes
//!
//! - **External drift**: the document changed underneath a command between
//!   undo and redo. Model primitives are total, so the command degrades to
//!   a partial no-op instead of corrupting unrelated entries.

use pagedeck_model::{DocumentModel, now_ms};
use thiserror::Error;

use crate::commands::{
    AddPages, AddRedaction, BatchCommand, DeletePages, DeleteRedaction, DuplicatePages,
    RemoveSource, ReorderPages, ResizePages, RotatePages, SplitGroup, UpdateOutline,
    UpdateRedaction,
};

// ---------------------------------------------------------------------------
// Stable type tags
// ---------------------------------------------------------------------------

pub const TAG_ADD_PAGES: &str = "addPages";
pub const TAG_DELETE_PAGES: &str = "deletePages";
pub const TAG_DUPLICATE_PAGES: &str = "duplicatePages";
pub const TAG_REORDER_PAGES: &str = "reorderPages";
pub const TAG_ROTATE_PAGES: &str = "rotatePages";
pub const TAG_RESIZE_PAGES: &str = "resizePages";
pub const TAG_SPLIT_GROUP: &str = "splitGroup";
pub const TAG_REMOVE_SOURCE: &str = "removeSource";
pub const TAG_ADD_REDACTION: &str = "addRedaction";
pub const TAG_UPDATE_REDACTION: &str = "updateRedaction";
pub const TAG_DELETE_REDACTION: &str = "deleteRedaction";
pub const TAG_UPDATE_OUTLINE: &str = "updateOutline";
pub const TAG_BATCH: &str = "batch";

/// Errors raised at command construction.
///
/// These never reach the history stack: a caller that cannot build a
/// command has nothing to enqueue.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    /// The target id list was empty.
    #[error("cannot {command} with an empty target list")]
    EmptyTargets { command: &'static str },
    /// Rotation delta outside the two supported quarter-turns.
    #[error("unsupported rotation delta {degrees}° (expected 90 or -90)")]
    InvalidRotation { degrees: i32 },
    /// A size that is not finite and strictly positive.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: f64, height: f64 },
    /// Reorder snapshots do not contain the same entry ids.
    #[error("new order is not a permutation of the previous order")]
    NotAPermutation,
    /// A redaction update tried to change the mark's identity.
    #[error("redaction update must keep the mark id (was '{previous}', got '{next}')")]
    RedactionIdMismatch { previous: String, next: String },
    /// The referenced source is not in the registry.
    #[error("source '{source_id}' is not registered")]
    UnknownSource { source_id: String },
    /// A page references a different source than the supplied metadata.
    #[error("page references source '{found}' but metadata is for '{expected}'")]
    SourceMismatch { expected: String, found: String },
    /// A batch needs at least one child.
    #[error("batch command has no children")]
    EmptyBatch,
}

// ---------------------------------------------------------------------------
// CommandKind
// ---------------------------------------------------------------------------

/// The closed set of concrete mutations.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    AddPages(AddPages),
    DeletePages(DeletePages),
    DuplicatePages(DuplicatePages),
    ReorderPages(ReorderPages),
    RotatePages(RotatePages),
    ResizePages(ResizePages),
    SplitGroup(SplitGroup),
    RemoveSource(RemoveSource),
    AddRedaction(AddRedaction),
    UpdateRedaction(UpdateRedaction),
    DeleteRedaction(DeleteRedaction),
    UpdateOutline(UpdateOutline),
    Batch(BatchCommand),
}

impl CommandKind {
    /// The stable wire tag for this kind.
    #[must_use]
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::AddPages(_) => TAG_ADD_PAGES,
            Self::DeletePages(_) => TAG_DELETE_PAGES,
            Self::DuplicatePages(_) => TAG_DUPLICATE_PAGES,
            Self::ReorderPages(_) => TAG_REORDER_PAGES,
            Self::RotatePages(_) => TAG_ROTATE_PAGES,
            Self::ResizePages(_) => TAG_RESIZE_PAGES,
            Self::SplitGroup(_) => TAG_SPLIT_GROUP,
            Self::RemoveSource(_) => TAG_REMOVE_SOURCE,
            Self::AddRedaction(_) => TAG_ADD_REDACTION,
            Self::UpdateRedaction(_) => TAG_UPDATE_REDACTION,
            Self::DeleteRedaction(_) => TAG_DELETE_REDACTION,
            Self::UpdateOutline(_) => TAG_UPDATE_OUTLINE,
            Self::Batch(_) => TAG_BATCH,
        }
    }

    /// The default human-readable label for this kind.
    #[must_use]
    pub fn default_label(&self) -> &'static str {
        default_label_for_tag(self.type_tag()).unwrap_or("Edit")
    }

    fn execute(&mut self, doc: &mut DocumentModel) {
        match self {
            Self::AddPages(cmd) => cmd.execute(doc),
            Self::DeletePages(cmd) => cmd.execute(doc),
            Self::DuplicatePages(cmd) => cmd.execute(doc),
            Self::ReorderPages(cmd) => cmd.execute(doc),
            Self::RotatePages(cmd) => cmd.execute(doc),
            Self::ResizePages(cmd) => cmd.execute(doc),
            Self::SplitGroup(cmd) => cmd.execute(doc),
            Self::RemoveSource(cmd) => cmd.execute(doc),
            Self::AddRedaction(cmd) => cmd.execute(doc),
            Self::UpdateRedaction(cmd) => cmd.execute(doc),
            Self::DeleteRedaction(cmd) => cmd.execute(doc),
            Self::UpdateOutline(cmd) => cmd.execute(doc),
            Self::Batch(cmd) => cmd.execute(doc),
        }
    }

    fn undo(&mut self, doc: &mut DocumentModel) {
        match self {
            Self::AddPages(cmd) => cmd.undo(doc),
            Self::DeletePages(cmd) => cmd.undo(doc),
            Self::DuplicatePages(cmd) => cmd.undo(doc),
            Self::ReorderPages(cmd) => cmd.undo(doc),
            Self::RotatePages(cmd) => cmd.undo(doc),
            Self::ResizePages(cmd) => cmd.undo(doc),
            Self::SplitGroup(cmd) => cmd.undo(doc),
            Self::RemoveSource(cmd) => cmd.undo(doc),
            Self::AddRedaction(cmd) => cmd.undo(doc),
            Self::UpdateRedaction(cmd) => cmd.undo(doc),
            Self::DeleteRedaction(cmd) => cmd.undo(doc),
            Self::UpdateOutline(cmd) => cmd.undo(doc),
            Self::Batch(cmd) => cmd.undo(doc),
        }
    }
}

/// The default label for a wire tag, used when migrating envelopes that
/// predate per-instance labels.
#[must_use]
pub fn default_label_for_tag(tag: &str) -> Option<&'static str> {
    match tag {
        TAG_ADD_PAGES => Some("Add pages"),
        TAG_DELETE_PAGES => Some("Delete pages"),
        TAG_DUPLICATE_PAGES => Some("Duplicate pages"),
        TAG_REORDER_PAGES => Some("Reorder pages"),
        TAG_ROTATE_PAGES => Some("Rotate pages"),
        TAG_RESIZE_PAGES => Some("Resize pages"),
        TAG_SPLIT_GROUP => Some("Split document"),
        TAG_REMOVE_SOURCE => Some("Remove file"),
        TAG_ADD_REDACTION => Some("Add redaction"),
        TAG_UPDATE_REDACTION => Some("Edit redaction"),
        TAG_DELETE_REDACTION => Some("Delete redaction"),
        TAG_UPDATE_OUTLINE => Some("Edit outline"),
        TAG_BATCH => Some("Grouped edit"),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// A named, reversible, serializable unit of mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    id: String,
    label: String,
    created_at: u64,
    kind: CommandKind,
}

impl Command {
    /// Wrap `kind` as a command with a fresh id, its default label, and a
    /// current timestamp.
    #[must_use]
    pub fn new(kind: CommandKind) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            label: kind.default_label().to_string(),
            created_at: now_ms(),
            kind,
        }
    }

    /// Override the human-readable label for this instance.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Reassemble a command from persisted parts (decode path). The id,
    /// label, and timestamp come back verbatim — never regenerated.
    #[must_use]
    pub(crate) fn from_parts(
        id: String,
        label: String,
        created_at: u64,
        kind: CommandKind,
    ) -> Self {
        Self {
            id,
            label,
            created_at,
            kind,
        }
    }

    /// Stable command id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Human-readable label for history UI.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Creation time, milliseconds since the Unix epoch. Cosmetic — the
    /// history cursor, not this value, decides undo/redo order.
    #[must_use]
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// The concrete mutation.
    #[must_use]
    pub fn kind(&self) -> &CommandKind {
        &self.kind
    }

    /// The stable wire tag.
    #[must_use]
    pub fn type_tag(&self) -> &'static str {
        self.kind.type_tag()
    }

    /// Apply the mutation to the document model.
    pub fn execute(&mut self, doc: &mut DocumentModel) {
        self.kind.execute(doc);
    }

    /// Exactly reverse the most recent execute.
    pub fn undo(&mut self, doc: &mut DocumentModel) {
        self.kind.undo(doc);
    }
}

impl From<CommandKind> for Command {
    fn from(kind: CommandKind) -> Self {
        Self::new(kind)
    }
}

macro_rules! impl_into_kind {
    ($($ty:ident),+ $(,)?) => {
        $(
            impl From<$ty> for CommandKind {
                fn from(value: $ty) -> Self {
                    Self::$ty(value)
                }
            }
        )+
    };
}

impl_into_kind!(
    AddPages,
    DeletePages,
    DuplicatePages,
    ReorderPages,
    RotatePages,
    ResizePages,
    SplitGroup,
    RemoveSource,
    AddRedaction,
    UpdateRedaction,
    DeleteRedaction,
    UpdateOutline,
);

impl From<BatchCommand> for CommandKind {
    fn from(value: BatchCommand) -> Self {
        Self::Batch(value)
    }
}
