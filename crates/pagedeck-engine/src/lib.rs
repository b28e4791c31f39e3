#![forbid(unsafe_code)]

//! pagedeck reversible-mutation engine.
//!
//! Every edit to a pagedeck document — reorder, rotate, delete, duplicate,
//! redact, split, import, remove — is a [`Command`]: a named, serializable
//! unit of mutation with an exact inverse. Commands flow one way: UI intent
//! constructs a command, the [`HistoryStack`] executes it against the
//! [`DocumentModel`](pagedeck_model::DocumentModel), and the resulting
//! state is debounced into a [`PersistenceSink`] as a whole
//! [`ProjectSnapshot`]. On reload, the document comes back from its own
//! snapshot while history is rebuilt through the [`CommandRegistry`] —
//! decode only, no re-execution — so undo/redo survive the page reload.
//!
//! # Key Components
//!
//! - [`Command`] / [`CommandKind`] — the command entity over a closed sum
//!   type of ~13 concrete mutations
//! - [`BatchCommand`] — several commands as one atomic history entry
//! - [`HistoryStack`] — the undo/redo pointer machine with branch discard
//!   and a bounded depth
//! - [`serialize`] / [`CommandRegistry`] — the durable wire contract:
//!   versioned envelopes, JSON-safety validation, tolerant reconstruction
//! - [`Session`] — one document's model + history + debounced persistence
//!
//! # Concurrency
//!
//! Single-threaded and cooperative. Construction, `execute`, and `undo`
//! run synchronously to completion; only the snapshot write is
//! eventually-consistent, and it is fire-and-forget.

pub mod command;
pub mod commands;
pub mod envelope;
pub mod history;
pub mod registry;
pub mod session;

pub use command::{Command, CommandError, CommandKind};
pub use commands::{
    AddPages, AddRedaction, BatchCommand, CapturedDimensions, DeletePages, DeleteRedaction,
    DuplicatePages, PageCopy, PageSnapshot, RemoveSource, ReorderPages, ResizePages, RotatePages,
    SplitGroup, UpdateOutline, UpdateRedaction,
};
pub use envelope::{
    DecodeError, JsonSafetyError, SCHEMA_VERSION, SerializeError, SerializedCommand,
    migrate_envelope, serialize, validate_json_safe,
};
pub use history::{HistoryConfig, HistoryEntry, HistoryStack, RehydrateReport};
pub use registry::{CommandRegistry, ReconstructFn};
pub use session::{MemorySink, PersistenceSink, ProjectSnapshot, Session, SessionConfig};
