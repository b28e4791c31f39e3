#![forbid(unsafe_code)]

//! The undo/redo pointer machine.
//!
//! [`HistoryStack`] owns the executed command instances and a cursor — the
//! index of the most recently executed entry (`None`: nothing executed).
//!
//! ```text
//! apply(cmd4)                       undo() x2
//! ┌───────────────────────────┐     ┌───────────────────────────┐
//! │ [cmd1, cmd2, cmd3, cmd4]  │     │ [cmd1, cmd2, cmd3, cmd4]  │
//! │                      ^    │     │        ^                  │
//! │                   cursor  │     │     cursor   (redo tail)  │
//! └───────────────────────────┘     └───────────────────────────┘
//!
//! apply(cmd5) — branch discard: the redo tail is gone
//! ┌───────────────────────────┐
//! │ [cmd1, cmd2, cmd5]        │
//! │               ^           │
//! └───────────────────────────┘
//! ```
//!
//! # Invariants
//!
//! 1. `cursor < entries.len()` whenever it is `Some`.
//! 2. `entries.len() <= config.max_depth` after any operation.
//! 3. Applying while not at the tail discards every entry after the cursor.
//! 4. Rehydration never re-runs `execute`; the document is restored from
//!    its own snapshot, history purely for further undo/redo.

use std::fmt;

use pagedeck_model::{DocumentModel, now_ms};
use tracing::{debug, warn};

use crate::command::Command;
use crate::envelope::{self, SerializedCommand};
use crate::registry::CommandRegistry;

/// Configuration for the history stack.
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Maximum number of entries to keep. Oldest entries are evicted when
    /// the cap is exceeded — bounded memory at the cost of unlimited undo
    /// depth.
    pub max_depth: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_depth: 50 }
    }
}

impl HistoryConfig {
    /// Create a configuration with a custom depth cap.
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Create an unlimited configuration (for testing).
    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            max_depth: usize::MAX,
        }
    }
}

/// One history slot: the executed command and when it was pushed.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub command: Command,
    /// Milliseconds since the Unix epoch. Cosmetic; the cursor is the only
    /// authority for undo/redo order.
    pub pushed_at: u64,
}

/// What rehydration managed to restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RehydrateReport {
    /// Entries decoded successfully.
    pub restored: usize,
    /// Entries dropped (unknown tag, malformed payload, bad version).
    pub skipped: usize,
}

/// The undo/redo stack: an ordered entry list plus a cursor.
pub struct HistoryStack {
    entries: Vec<HistoryEntry>,
    cursor: Option<usize>,
    config: HistoryConfig,
}

impl fmt::Debug for HistoryStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryStack")
            .field("len", &self.entries.len())
            .field("cursor", &self.cursor)
            .field("config", &self.config)
            .finish()
    }
}

impl Default for HistoryStack {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl HistoryStack {
    /// Create an empty stack.
    #[must_use]
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            entries: Vec::new(),
            cursor: None,
            config,
        }
    }

    // ========================================================================
    // Core transitions
    // ========================================================================

    /// Execute `command` and append it as the new tail.
    ///
    /// If the cursor is not at the tail, everything after it is discarded
    /// first — a new edit invalidates the old future. The freshly applied
    /// command is also run through the envelope validator so a payload that
    /// cannot persist is flagged the moment it is authored, not at reload.
    pub fn apply(&mut self, mut command: Command, doc: &mut DocumentModel) {
        match self.cursor {
            Some(cursor) => self.entries.truncate(cursor + 1),
            None => self.entries.clear(),
        }

        command.execute(doc);
        if let Err(err) = envelope::serialize(&command) {
            warn!(
                type_tag = command.type_tag(),
                error = %err,
                "command payload will not survive persistence"
            );
        }

        self.entries.push(HistoryEntry {
            command,
            pushed_at: now_ms(),
        });
        self.cursor = Some(self.entries.len() - 1);
        self.enforce_depth();
    }

    /// Undo the entry at the cursor and step back.
    ///
    /// Returns the undone command's label, or `None` when there is nothing
    /// to undo.
    pub fn undo(&mut self, doc: &mut DocumentModel) -> Option<String> {
        let cursor = self.cursor?;
        let entry = &mut self.entries[cursor];
        entry.command.undo(doc);
        let label = entry.command.label().to_string();
        self.cursor = cursor.checked_sub(1);
        Some(label)
    }

    /// Step forward and re-execute the next entry.
    ///
    /// Returns the redone command's label, or `None` when the cursor is
    /// already at the tail.
    pub fn redo(&mut self, doc: &mut DocumentModel) -> Option<String> {
        let next = match self.cursor {
            Some(cursor) if cursor + 1 < self.entries.len() => cursor + 1,
            None if !self.entries.is_empty() => 0,
            _ => return None,
        };
        let entry = &mut self.entries[next];
        entry.command.execute(doc);
        let label = entry.command.label().to_string();
        self.cursor = Some(next);
        Some(label)
    }

    /// Walk the cursor to `target` (`None`: before the first entry) by
    /// repeated undo/redo. O(distance).
    pub fn jump_to(&mut self, target: Option<usize>, doc: &mut DocumentModel) {
        let target_pointer = match target {
            Some(index) if !self.entries.is_empty() => {
                index.min(self.entries.len() - 1) as i64
            }
            _ => -1,
        };
        while self.pointer() > target_pointer {
            if self.undo(doc).is_none() {
                break;
            }
        }
        while self.pointer() < target_pointer {
            if self.redo(doc).is_none() {
                break;
            }
        }
    }

    /// Drop all history.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }

    fn enforce_depth(&mut self) {
        while self.entries.len() > self.config.max_depth {
            self.entries.remove(0);
            self.cursor = self.cursor.and_then(|cursor| cursor.checked_sub(1));
            debug!("evicted oldest history entry");
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Whether there is anything to undo.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.cursor.is_some()
    }

    /// Whether there is anything to redo.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        match self.cursor {
            Some(cursor) => cursor + 1 < self.entries.len(),
            None => !self.entries.is_empty(),
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The cursor as an index, `None` when nothing is executed.
    #[must_use]
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// The cursor in wire form: index of the most recently executed entry,
    /// `-1` when nothing is executed.
    #[must_use]
    pub fn pointer(&self) -> i64 {
        self.cursor.map_or(-1, |cursor| cursor as i64)
    }

    /// The entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Labels available to undo, most recent first.
    #[must_use]
    pub fn undo_labels(&self, limit: usize) -> Vec<&str> {
        match self.cursor {
            Some(cursor) => self.entries[..=cursor]
                .iter()
                .rev()
                .take(limit)
                .map(|entry| entry.command.label())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Labels available to redo, nearest first.
    #[must_use]
    pub fn redo_labels(&self, limit: usize) -> Vec<&str> {
        let start = self.cursor.map_or(0, |cursor| cursor + 1);
        self.entries[start..]
            .iter()
            .take(limit)
            .map(|entry| entry.command.label())
            .collect()
    }

    // ========================================================================
    // Persistence boundary
    // ========================================================================

    /// Serialize every entry for the persisted snapshot.
    ///
    /// Entries that fail serialization are skipped with a warning and the
    /// returned pointer is shifted down past them, so the persisted pair
    /// stays consistent.
    #[must_use]
    pub fn serialize_entries(&self) -> (Vec<SerializedCommand>, i64) {
        let mut envelopes = Vec::with_capacity(self.entries.len());
        let mut pointer = self.pointer();
        for (index, entry) in self.entries.iter().enumerate() {
            match envelope::serialize(&entry.command) {
                Ok(serialized) => envelopes.push(serialized),
                Err(err) => {
                    warn!(
                        type_tag = entry.command.type_tag(),
                        error = %err,
                        "dropping unserializable history entry from snapshot"
                    );
                    if (index as i64) <= self.pointer() {
                        pointer -= 1;
                    }
                }
            }
        }
        (envelopes, pointer)
    }

    /// Rebuild a stack from persisted envelopes.
    ///
    /// Each envelope is migrated and decoded through `registry`; failures
    /// are dropped with a warning and the pointer shifts down past them.
    /// `execute` is **never** re-run here — the document state was restored
    /// from its own snapshot, and history is rebuilt purely so undo/redo
    /// keep working.
    #[must_use]
    pub fn rehydrate(
        envelopes: &[SerializedCommand],
        pointer: i64,
        registry: &CommandRegistry,
        config: HistoryConfig,
    ) -> (Self, RehydrateReport) {
        let mut entries = Vec::with_capacity(envelopes.len());
        let mut adjusted = pointer;
        let mut skipped = 0usize;

        for (index, serialized) in envelopes.iter().enumerate() {
            match registry.decode(serialized) {
                Ok(command) => entries.push(HistoryEntry {
                    command,
                    pushed_at: serialized.timestamp,
                }),
                Err(err) => {
                    skipped += 1;
                    warn!(
                        type_tag = %serialized.type_tag,
                        error = %err,
                        "dropping unrestorable history entry"
                    );
                    if (index as i64) <= pointer {
                        adjusted -= 1;
                    }
                }
            }
        }

        let restored = entries.len();
        let max_pointer = entries.len() as i64 - 1;
        let adjusted = adjusted.clamp(-1, max_pointer.max(-1));
        let mut stack = Self {
            entries,
            cursor: usize::try_from(adjusted).ok(),
            config,
        };
        stack.enforce_depth();

        (stack, RehydrateReport { restored, skipped })
    }
}
